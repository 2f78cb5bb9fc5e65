//! stage-core: Core configuration and error types for stagehand
//!
//! This crate provides the configuration structures and the error taxonomy
//! shared by the embedded control server and the orchestrator.

pub mod config;
pub mod error;

pub use config::{load_config, ControlEndpoint, OrchestratorConfig, ServerConfig, DEFAULT_CONTROL_PORT};
pub use error::{ClientError, ConfigError, ControlError, LaunchError};
