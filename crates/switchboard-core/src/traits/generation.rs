// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation adapter trait for the opaque text-generation capability.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::SwitchboardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::Prompt;

/// A finite, non-restartable stream of generated text chunks.
///
/// A failure is delivered as a terminal `Err` item.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, SwitchboardError>> + Send>>;

/// Adapter for text-generation backends.
///
/// Supports a blocking mode (whole text) and a streaming mode (chunks as
/// they are produced). Timeouts are applied by the caller.
#[async_trait]
pub trait GenerationAdapter: PluginAdapter {
    /// Generates the complete reply for a prompt.
    async fn complete(&self, prompt: Prompt) -> Result<String, SwitchboardError>;

    /// Starts a streaming generation for a prompt.
    async fn stream(&self, prompt: Prompt) -> Result<TextStream, SwitchboardError>;
}
