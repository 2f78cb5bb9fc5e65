//! Resource lifecycle model
//!
//! The orchestrator presents the controlled application as a single resource
//! whose state moves through a small machine. Snapshots are pushed to a
//! [`NotificationSink`] whenever the state changes; whoever hosts the
//! orchestrator (a dashboard, a supervisor, a log) implements the sink.

use std::sync::Mutex;
use std::time::SystemTime;

/// Lifecycle state of the controlled resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Process located or launched, waiting for the control endpoint
    Starting,
    /// Control endpoint healthy and the work session is running
    Running,
    /// Endpoint reachable but the `start` command was rejected
    StartedButRunFailed,
    /// A live process was found but its control endpoint never answered
    DetectedProcessButControlError,
    /// The process could not be located or launched at all
    FailedToStart,
    /// The process went away on its own
    Exited,
    /// A stop was requested and is being delivered
    Stopping,
    /// Stop delivered; the resource is done
    Finished,
}

impl ResourceState {
    /// Terminal states never transition again
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResourceState::Exited | ResourceState::Finished | ResourceState::FailedToStart
        )
    }

    /// Stable name used in logs and notifications
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceState::Starting => "starting",
            ResourceState::Running => "running",
            ResourceState::StartedButRunFailed => "started-but-run-failed",
            ResourceState::DetectedProcessButControlError => "detected-process-but-control-error",
            ResourceState::FailedToStart => "failed-to-start",
            ResourceState::Exited => "exited",
            ResourceState::Stopping => "stopping",
            ResourceState::Finished => "finished",
        }
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published view of the resource at a point in time
#[derive(Debug, Clone)]
pub struct ResourceSnapshot {
    pub state: ResourceState,
    pub timestamp: SystemTime,
    /// Endpoint URLs the resource currently serves; empty once it exits
    pub urls: Vec<String>,
}

impl ResourceSnapshot {
    pub fn new(state: ResourceState, urls: Vec<String>) -> Self {
        Self {
            state,
            timestamp: SystemTime::now(),
            urls,
        }
    }

    /// Snapshot with no live endpoints
    pub fn bare(state: ResourceState) -> Self {
        Self::new(state, Vec::new())
    }
}

/// Receives resource snapshots as the driver moves through states
pub trait NotificationSink: Send + Sync {
    fn publish(&self, resource_name: &str, snapshot: ResourceSnapshot);
}

/// Sink that writes every transition to the log
#[derive(Debug, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn publish(&self, resource_name: &str, snapshot: ResourceSnapshot) {
        if snapshot.urls.is_empty() {
            tracing::info!(resource = resource_name, state = %snapshot.state, "Resource state changed");
        } else {
            tracing::info!(
                resource = resource_name,
                state = %snapshot.state,
                urls = ?snapshot.urls,
                "Resource state changed"
            );
        }
    }
}

/// Sink that records every snapshot, for tests and inspection
#[derive(Debug, Default)]
pub struct RecordingSink {
    snapshots: Mutex<Vec<ResourceSnapshot>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<ResourceSnapshot> {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn last_state(&self) -> Option<ResourceState> {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .map(|s| s.state)
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&self, _resource_name: &str, snapshot: ResourceSnapshot) {
        self.snapshots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ResourceState::Exited.is_terminal());
        assert!(ResourceState::Finished.is_terminal());
        assert!(ResourceState::FailedToStart.is_terminal());

        assert!(!ResourceState::Starting.is_terminal());
        assert!(!ResourceState::Running.is_terminal());
        assert!(!ResourceState::Stopping.is_terminal());
        assert!(!ResourceState::StartedButRunFailed.is_terminal());
        assert!(!ResourceState::DetectedProcessButControlError.is_terminal());
    }

    #[test]
    fn test_recording_sink_order() {
        let sink = RecordingSink::new();
        sink.publish("app", ResourceSnapshot::bare(ResourceState::Starting));
        sink.publish(
            "app",
            ResourceSnapshot::new(
                ResourceState::Running,
                vec!["http://127.0.0.1:54021".to_string()],
            ),
        );

        let snapshots = sink.snapshots();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].state, ResourceState::Starting);
        assert_eq!(snapshots[1].state, ResourceState::Running);
        assert!(snapshots[0].timestamp <= snapshots[1].timestamp);
        assert_eq!(sink.last_state(), Some(ResourceState::Running));
    }

    #[test]
    fn test_exited_snapshot_has_no_urls() {
        let snapshot = ResourceSnapshot::bare(ResourceState::Exited);
        assert!(snapshot.urls.is_empty());
    }
}
