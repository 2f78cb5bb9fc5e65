//! Resource driver
//!
//! Owns the lifecycle of the controlled application as seen from the
//! orchestrator: find or launch the process, wait for its control endpoint,
//! tell it to start working, and publish every state change. Terminal states
//! are sticky; once the resource has exited, finished, or failed to start,
//! no later event may resurrect it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use stage_core::{ControlError, LaunchError, OrchestratorConfig};

use crate::client::ControlClient;
use crate::health::{HealthProbe, HealthStatus};
use crate::install;
use crate::process::{ProcessHandle, ProcessManager};
use crate::resource::{NotificationSink, ResourceSnapshot, ResourceState};

/// How often the exit watcher checks a located process for liveness
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Drives the controlled application through its resource lifecycle
pub struct ResourceDriver {
    config: OrchestratorConfig,
    resource_name: String,
    client: ControlClient,
    manager: Arc<dyn ProcessManager>,
    sink: Arc<dyn NotificationSink>,
    cancel: CancellationToken,
    current: Mutex<Option<ResourceState>>,
}

impl ResourceDriver {
    pub fn new(
        config: OrchestratorConfig,
        manager: Arc<dyn ProcessManager>,
        sink: Arc<dyn NotificationSink>,
        cancel: CancellationToken,
    ) -> Self {
        let client = ControlClient::new(&config.endpoint, config.call_timeout);
        let resource_name = config
            .work_directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resource".to_string());
        Self {
            config,
            resource_name,
            client,
            manager,
            sink,
            cancel,
            current: Mutex::new(None),
        }
    }

    /// The client this driver talks to the process with
    pub fn client(&self) -> &ControlClient {
        &self.client
    }

    /// Last published state, if any
    pub fn state(&self) -> Option<ResourceState> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish a state change unless the resource is already terminal
    fn publish(&self, state: ResourceState, urls: Vec<String>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = *current {
            if existing.is_terminal() {
                tracing::trace!(
                    from = %existing,
                    to = %state,
                    "Ignoring transition out of terminal state"
                );
                return;
            }
        }
        *current = Some(state);
        drop(current);

        self.sink
            .publish(&self.resource_name, ResourceSnapshot::new(state, urls));
    }

    /// Bring the resource up: locate or launch, wait for health, start.
    ///
    /// Publishes `Starting` first and ends in `Running`,
    /// `StartedButRunFailed`, `DetectedProcessButControlError`, or
    /// `FailedToStart`. Only launch failures are returned as errors; the
    /// control-plane outcomes are reported purely through the sink.
    pub async fn start_resource(self: &Arc<Self>) -> Result<(), ControlError> {
        self.publish(ResourceState::Starting, Vec::new());

        let handle = match self.manager.locate(&self.config.work_directory) {
            Some(handle) => {
                tracing::info!(pid = handle.pid, "Attached to already-running process");
                handle
            }
            None => match self.launch() {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::error!(error = %e, "Could not start process");
                    self.publish(ResourceState::FailedToStart, Vec::new());
                    return Err(ControlError::Launch(e));
                }
            },
        };

        self.spawn_exit_watcher(handle);

        let ready = self.wait_for_health().await;
        if !ready && !self.config.start_after_health_timeout {
            tracing::warn!("Health budget exhausted, giving up on control endpoint");
            self.publish(ResourceState::DetectedProcessButControlError, Vec::new());
            return Ok(());
        }
        if !ready {
            tracing::warn!("Health budget exhausted, attempting start anyway");
        }

        match self.client.start_detailed(&self.config.session).await {
            Ok(true) => {
                self.publish(
                    ResourceState::Running,
                    vec![self.config.endpoint.base_url()],
                );
            }
            Ok(false) => {
                tracing::warn!(session = %self.config.session, "Process refused to start session");
                self.publish(ResourceState::StartedButRunFailed, Vec::new());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Control endpoint unreachable");
                self.publish(ResourceState::DetectedProcessButControlError, Vec::new());
            }
        }

        Ok(())
    }

    /// Bring the resource down: deliver a stop and finish.
    ///
    /// Best effort by design; a process that already went away still counts
    /// as stopped.
    pub async fn stop_resource(&self) {
        self.publish(ResourceState::Stopping, Vec::new());

        if !self.client.stop().await {
            tracing::debug!("Stop not acknowledged; process may already be gone");
        }

        self.publish(ResourceState::Finished, Vec::new());
        self.cancel.cancel();
    }

    fn launch(&self) -> Result<ProcessHandle, LaunchError> {
        let executable = install::resolve_executable(
            self.config.executable.as_deref(),
            self.config.install_root.as_deref(),
            &self.config.work_directory,
        )?;
        self.manager.launch(&executable, &self.config.work_directory)
    }

    /// Watch the process and publish `Exited` when it goes away.
    ///
    /// A launched process is waited on directly; a located one is polled
    /// through the process table.
    fn spawn_exit_watcher(self: &Arc<Self>, mut handle: ProcessHandle) {
        let driver = Arc::clone(self);
        let pid = handle.pid;

        if let Some(mut child) = handle.child.take() {
            tokio::task::spawn_blocking(move || {
                match child.wait() {
                    Ok(status) => tracing::info!(pid, %status, "Process exited"),
                    Err(e) => tracing::warn!(pid, error = %e, "Waiting on process failed"),
                }
                driver.publish(ResourceState::Exited, Vec::new());
                driver.cancel.cancel();
            });
        } else {
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = driver.cancel.cancelled() => return,
                        _ = sleep(EXIT_POLL_INTERVAL) => {}
                    }
                    if !driver.manager.is_alive(pid) {
                        tracing::info!(pid, "Process went away");
                        driver.publish(ResourceState::Exited, Vec::new());
                        driver.cancel.cancel();
                        return;
                    }
                }
            });
        }
    }

    /// Poll the endpoint until it answers or the budget runs out
    async fn wait_for_health(&self) -> bool {
        let deadline = Instant::now() + self.config.health_poll_timeout;

        loop {
            if self.client.health(HealthProbe::Editor).await == HealthStatus::Healthy {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                _ = sleep(self.config.health_poll_interval) => {}
            }
        }
    }
}
