//! stage-orchestrator: Orchestrator daemon for the stagehand control plane
//!
//! The orchestrator locates or launches the controlled application, waits
//! for its control endpoint to become healthy, commands it to start a work
//! session, and publishes the resource's lifecycle state.

pub mod client;
pub mod driver;
pub mod health;
pub mod install;
pub mod process;
pub mod resource;

pub use client::ControlClient;
pub use driver::ResourceDriver;
pub use health::{HealthProbe, HealthStatus};
pub use process::{ProcessHandle, ProcessManager, SystemProcessManager};
pub use resource::{NotificationSink, ResourceSnapshot, ResourceState};
