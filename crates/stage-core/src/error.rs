//! Core error types for stagehand

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the stagehand ecosystem
#[derive(Error, Debug)]
pub enum ControlError {
    /// Process launch error
    #[error("Launch error: {0}")]
    Launch(#[from] LaunchError),

    /// Control client error
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors locating or launching the controlled process
#[derive(Error, Debug)]
pub enum LaunchError {
    /// The configured executable does not exist
    #[error("Executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    /// The executable could not be resolved from the install roots
    #[error("No executable for version {version} under the configured install roots")]
    VersionNotInstalled { version: String },

    /// The work directory carries no version marker
    #[error("No version marker found in work directory {0}")]
    VersionUnknown(PathBuf),

    /// Process creation did not yield a handle
    #[error("Failed to start process: {0}")]
    SpawnFailed(#[source] std::io::Error),
}

/// Errors talking to an already-running controlled process
///
/// The control client itself swallows these into `false`; the driver uses
/// them only where the distinction between unreachable and rejected matters.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, reset)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The endpoint answered but refused the command
    #[error("Command rejected: {0}")]
    Rejected(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
}
