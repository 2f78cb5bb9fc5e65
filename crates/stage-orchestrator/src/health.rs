//! Health probes and status combination
//!
//! The controlled process exposes independent readiness facets: the editor
//! facet says the control endpoint is reachable and dispatching, the
//! playmode facet says a work session is active. Probes are read-only; when
//! several gate readiness they combine with AND semantics.

/// A readiness facet of the controlled process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthProbe {
    /// Control endpoint reachable and dispatching commands
    Editor,
    /// A work session is running
    Playmode,
    /// All facets at once
    Merged,
}

impl HealthProbe {
    /// Wire path of the probe endpoint
    pub fn path(&self) -> &'static str {
        match self {
            HealthProbe::Editor => "editor-health",
            HealthProbe::Playmode => "playmode-health",
            HealthProbe::Merged => "health",
        }
    }

    /// Whether the probe requires the response body to read `healthy`,
    /// rather than mere reachability
    pub fn checks_body(&self) -> bool {
        !matches!(self, HealthProbe::Editor)
    }
}

/// Result of one or more health probes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl HealthStatus {
    /// Healthy only if both sides are
    pub fn and(self, other: HealthStatus) -> HealthStatus {
        match (self, other) {
            (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
            _ => HealthStatus::Unhealthy,
        }
    }
}

impl From<bool> for HealthStatus {
    fn from(healthy: bool) -> Self {
        if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}
