// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus export for the tapcount update scheduler.
//!
//! The scheduler records through the metrics-rs facade; this crate installs
//! the Prometheus recorder and renders the text exposition served on the
//! gateway's `/metrics` route.

pub mod recording;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use tapcount_core::{AdapterType, HealthStatus, PluginAdapter, TapcountError};

pub use recording::{record_update, set_queue_depth, set_throughput, set_tier_paused};

/// Owns the process-wide Prometheus recorder.
pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Installs the recorder globally. Fails if another recorder is
    /// already installed in this process.
    pub fn new() -> Result<Self, TapcountError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            TapcountError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();
        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    pub fn handle(&self) -> &PrometheusHandle {
        &self.handle
    }

    /// Render every collected metric in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

#[async_trait]
impl PluginAdapter for PrometheusAdapter {
    fn name(&self) -> &str {
        "prometheus"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Observability
    }

    async fn health_check(&self) -> Result<HealthStatus, TapcountError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TapcountError> {
        Ok(())
    }
}
