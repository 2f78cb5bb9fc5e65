//! HTTP control client
//!
//! Thin wrapper over the wire protocol: every call is one request whose
//! entire meaning is in the response body token. The public `bool` methods
//! swallow transport errors so callers can treat an unreachable endpoint the
//! same as a refusal; the `_detailed` variants keep the distinction for the
//! driver, which reports those two outcomes as different resource states.

use std::time::Duration;

use stage_core::{ClientError, ControlEndpoint};
use stage_protocol::ControlRequest;

use crate::health::{HealthProbe, HealthStatus};

/// Client for the control endpoint of a running controlled process
#[derive(Debug, Clone)]
pub struct ControlClient {
    http: reqwest::Client,
    base_url: String,
    call_timeout: Duration,
}

impl ControlClient {
    pub fn new(endpoint: &ControlEndpoint, call_timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: endpoint.base_url(),
            call_timeout,
        }
    }

    /// Issue one request and return the raw response token.
    ///
    /// Mutating commands go over POST, read-only probes over GET; the server
    /// ignores the method, so this is a courtesy to intermediaries.
    async fn call(
        &self,
        method: reqwest::Method,
        request: &ControlRequest,
    ) -> Result<String, ClientError> {
        let url = format!("{}{}", self.base_url, request.to_path());
        let response = self
            .http
            .request(method, &url)
            .timeout(self.call_timeout)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(body.trim().to_string())
    }

    /// Command the process to start a work session.
    ///
    /// `Ok(true)` means accepted, `Ok(false)` means the endpoint answered but
    /// refused, `Err` means the endpoint was unreachable.
    pub async fn start_detailed(&self, session: &str) -> Result<bool, ClientError> {
        let argument = if session.is_empty() || session == "-1" {
            ""
        } else {
            session
        };
        let token = self
            .call(reqwest::Method::POST, &ControlRequest::new("start", argument))
            .await?;
        tracing::debug!(%token, "start response");
        Ok(token.starts_with("ok"))
    }

    /// Command the process to start; any failure reads as `false`
    pub async fn start(&self, session: &str) -> bool {
        self.start_detailed(session).await.unwrap_or(false)
    }

    /// Command the process to stop its work session
    pub async fn stop(&self) -> bool {
        match self
            .call(reqwest::Method::POST, &ControlRequest::new("stop", ""))
            .await
        {
            Ok(token) => token.starts_with("ok"),
            Err(e) => {
                tracing::debug!(error = %e, "stop request failed");
                false
            }
        }
    }

    /// Probe one readiness facet
    pub async fn health(&self, probe: HealthProbe) -> HealthStatus {
        match self
            .call(reqwest::Method::GET, &ControlRequest::new(probe.path(), ""))
            .await
        {
            Ok(token) => {
                if probe.checks_body() {
                    HealthStatus::from(token == "healthy")
                } else {
                    HealthStatus::Healthy
                }
            }
            Err(e) => {
                tracing::trace!(probe = probe.path(), error = %e, "health probe failed");
                HealthStatus::Unhealthy
            }
        }
    }

    /// Push a JSON configuration document to the process
    pub async fn apply_config(&self, json: &str) -> Result<(), ClientError> {
        let token = self
            .call(reqwest::Method::POST, &ControlRequest::new("config", json))
            .await?;
        if token.starts_with("ok") {
            Ok(())
        } else {
            Err(ClientError::Rejected(token))
        }
    }
}
