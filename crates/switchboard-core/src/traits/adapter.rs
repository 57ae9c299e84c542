// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity and lifecycle shared by every pluggable component.

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::types::{AdapterType, HealthStatus};

/// Common surface of channels, generators, classifiers and storage.
///
/// `/health` probes storage through [`health_check`](Self::health_check);
/// `serve` calls [`shutdown`](Self::shutdown) on the way out.
#[async_trait]
pub trait PluginAdapter: Send + Sync + 'static {
    /// Short stable identifier, e.g. `"sqlite"` or `"whatsapp"`.
    fn name(&self) -> &str;

    fn version(&self) -> semver::Version;

    fn adapter_type(&self) -> AdapterType;

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError>;

    /// Releases connections and background resources. Called once.
    async fn shutdown(&self) -> Result<(), SwitchboardError>;
}
