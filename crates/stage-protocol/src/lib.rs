//! stage-protocol: Wire protocol for the stagehand control plane
//!
//! This crate defines the plain-text protocol spoken between the orchestrator
//! and the control server embedded in the controlled application. Requests
//! are a single `METHOD /command/argument` line; responses are one status
//! token wrapped in a minimal HTTP envelope.

pub mod request;
pub mod response;

pub use request::ControlRequest;
pub use response::{http_response, tokens, HEADER_TERMINATOR};
