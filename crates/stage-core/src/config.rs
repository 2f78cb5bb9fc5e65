//! Configuration for the control plane
//!
//! Everything a component needs is passed in explicitly through these
//! structures; no component reads the environment ad hoc.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Default control-plane port
pub const DEFAULT_CONTROL_PORT: u16 = 54021;

/// Where the control server listens and the client connects
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlEndpoint {
    /// Host the control server binds to (loopback by default)
    pub host: String,

    /// Control-plane port
    pub port: u16,
}

impl Default for ControlEndpoint {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_CONTROL_PORT,
        }
    }
}

impl ControlEndpoint {
    /// Socket address for binding the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL the control client talks to
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Configuration for the embedded control server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Endpoint to listen on
    pub endpoint: ControlEndpoint,

    /// Per-request socket read budget
    #[serde(with = "duration_millis")]
    pub read_timeout: Duration,

    /// How long a request may wait for the owner thread
    #[serde(with = "duration_millis")]
    pub dispatch_timeout: Duration,

    /// Sleep between accept polls when no connection is pending
    #[serde(with = "duration_millis")]
    pub accept_poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: ControlEndpoint::default(),
            read_timeout: Duration::from_millis(2000),
            dispatch_timeout: Duration::from_millis(2000),
            accept_poll_interval: Duration::from_millis(100),
        }
    }
}

/// Configuration for the orchestrator daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Endpoint of the controlled process's control server
    pub endpoint: ControlEndpoint,

    /// Work directory identifying the controlled-process instance
    pub work_directory: PathBuf,

    /// Explicit path to the executable, if known
    pub executable: Option<PathBuf>,

    /// Install root searched for a versioned executable when no explicit
    /// path is given
    pub install_root: Option<PathBuf>,

    /// Session argument passed to `start` (scene index or name; empty or
    /// "-1" means the currently open one)
    pub session: String,

    /// Interval between health probes while waiting for readiness
    #[serde(with = "duration_secs")]
    pub health_poll_interval: Duration,

    /// Overall budget for the readiness poll loop
    #[serde(with = "duration_secs")]
    pub health_poll_timeout: Duration,

    /// Per-call timeout for control requests
    #[serde(with = "duration_secs")]
    pub call_timeout: Duration,

    /// Attempt `start` even when the health budget runs out
    pub start_after_health_timeout: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            endpoint: ControlEndpoint::default(),
            work_directory: PathBuf::from("."),
            executable: None,
            install_root: None,
            session: "-1".to_string(),
            health_poll_interval: Duration::from_secs(10),
            health_poll_timeout: Duration::from_secs(300),
            call_timeout: Duration::from_secs(5),
            start_after_health_timeout: true,
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read config: {}", e)))?;

    let config: T = toml::from_str(&content)?;
    Ok(config)
}

// Helper modules for Duration serialization
mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod duration_millis {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_addresses() {
        let endpoint = ControlEndpoint::default();
        assert_eq!(endpoint.bind_address(), "127.0.0.1:54021");
        assert_eq!(endpoint.base_url(), "http://127.0.0.1:54021");
    }

    #[test]
    fn test_orchestrator_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.health_poll_interval, Duration::from_secs(10));
        assert_eq!(config.health_poll_timeout, Duration::from_secs(300));
        assert!(config.start_after_health_timeout);
        assert_eq!(config.session, "-1");
    }

    #[test]
    fn test_load_config_from_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
work_directory = "/srv/project"
session = "2"
health_poll_interval = 1
start_after_health_timeout = false

[endpoint]
port = 6001
"#,
        )
        .unwrap();

        let config: OrchestratorConfig = load_config(&path).unwrap();
        assert_eq!(config.work_directory, PathBuf::from("/srv/project"));
        assert_eq!(config.session, "2");
        assert_eq!(config.endpoint.port, 6001);
        assert_eq!(config.health_poll_interval, Duration::from_secs(1));
        assert!(!config.start_after_health_timeout);
        // Unspecified fields keep their defaults
        assert_eq!(config.health_poll_timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result: Result<OrchestratorConfig, _> =
            load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_server_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.read_timeout, Duration::from_millis(2000));
        assert_eq!(config.dispatch_timeout, Duration::from_millis(2000));
        assert_eq!(config.accept_poll_interval, Duration::from_millis(100));
    }
}
