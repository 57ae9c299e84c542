// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric recording and Prometheus text exposition.
//!
//! Call sites use the free functions in [`recording`]; they go through the
//! `metrics` facade and cost nothing until [`PrometheusAdapter::install`]
//! puts a recorder in place. `/metrics` serves [`PrometheusAdapter::render_fn`].

pub mod recording;

use std::sync::Arc;

use async_trait::async_trait;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use switchboard_core::SwitchboardError;
use switchboard_core::traits::adapter::PluginAdapter;
use switchboard_core::types::{AdapterType, HealthStatus};

pub use recording::{
    record_escalation, record_generation_failure, record_generation_latency, record_intent,
    record_message, record_reply, set_open_conversations,
};

/// Shared renderer handed to the HTTP layer.
pub type RenderFn = Arc<dyn Fn() -> String + Send + Sync>;

pub struct PrometheusAdapter {
    handle: PrometheusHandle,
}

impl PrometheusAdapter {
    /// Installs the process-wide recorder and describes every metric.
    ///
    /// Fails if some recorder is already installed.
    pub fn install() -> Result<Self, SwitchboardError> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| SwitchboardError::Internal(format!("metrics recorder: {e}")))?;
        recording::register_metrics();
        tracing::info!("prometheus recorder installed");
        Ok(Self { handle })
    }

    /// Recorder that only counts inside [`metrics::with_local_recorder`].
    pub fn detached() -> (Self, PrometheusRecorder) {
        let recorder = PrometheusBuilder::new().build_recorder();
        let adapter = Self {
            handle: recorder.handle(),
        };
        (adapter, recorder)
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    pub fn render_fn(&self) -> RenderFn {
        let handle = self.handle.clone();
        Arc::new(move || handle.render())
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

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        Ok(())
    }
}
