// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API backend for Switchboard reply generation.
//!
//! Implements [`GenerationAdapter`] with both single-shot completion and
//! streaming SSE responses.

pub mod client;
pub mod sse;
pub mod types;

use async_trait::async_trait;
use futures::stream::StreamExt;
use switchboard_config::model::AnthropicConfig;
use switchboard_core::traits::{GenerationAdapter, PluginAdapter};
use switchboard_core::types::{AdapterType, HealthStatus, Prompt};
use switchboard_core::{SwitchboardError, TextStream};
use tracing::{debug, info};

use crate::client::AnthropicClient;
use crate::sse::StreamEvent;
use crate::types::MessageRequest;

/// Text generation over the Anthropic Messages API.
///
/// API key resolution order: config, then `ANTHROPIC_API_KEY`, then error.
pub struct AnthropicGenerator {
    client: AnthropicClient,
    model: String,
    max_tokens: u32,
}

impl AnthropicGenerator {
    pub fn new(config: &AnthropicConfig) -> Result<Self, SwitchboardError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = AnthropicClient::new(&api_key, &config.api_version, &config.base_url)?;

        info!(model = %config.model, "anthropic generator initialized");

        Ok(Self {
            client,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn request(&self, prompt: &Prompt) -> MessageRequest {
        MessageRequest::from_prompt(prompt, &self.model, self.max_tokens)
    }
}

fn resolve_api_key(config_key: &Option<String>) -> Result<String, SwitchboardError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
        SwitchboardError::Config(
            "Anthropic API key not found. Set anthropic.api_key in config or ANTHROPIC_API_KEY environment variable.".into(),
        )
    })
}

#[async_trait]
impl PluginAdapter for AnthropicGenerator {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generation
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        // No API call here: health checks must not consume tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        debug!("anthropic generator shutting down");
        Ok(())
    }
}

#[async_trait]
impl GenerationAdapter for AnthropicGenerator {
    async fn complete(&self, prompt: Prompt) -> Result<String, SwitchboardError> {
        let response = self.client.complete_message(&self.request(&prompt)).await?;
        debug!(
            id = %response.id,
            model = %response.model,
            stop_reason = ?response.stop_reason,
            "anthropic completion received"
        );
        Ok(response.text())
    }

    async fn stream(&self, prompt: Prompt) -> Result<TextStream, SwitchboardError> {
        let events = self.client.stream_message(&self.request(&prompt)).await?;

        // Ends at message_stop; an in-stream error becomes the terminal item.
        let chunks = events
            .take_while(|event| std::future::ready(!matches!(event, Ok(StreamEvent::MessageStop))))
            .filter_map(|event| {
                std::future::ready(match event {
                    Ok(StreamEvent::Text(text)) => Some(Ok(text)),
                    Ok(StreamEvent::Error(message)) => {
                        Some(Err(SwitchboardError::generation(message)))
                    }
                    Ok(StreamEvent::Stopped(reason)) => {
                        debug!(stop_reason = ?reason, "anthropic stream stopping");
                        None
                    }
                    Ok(StreamEvent::MessageStop) => None,
                    Err(e) => Some(Err(e)),
                })
            })
            .scan(false, |failed, item| {
                if *failed {
                    return std::future::ready(None);
                }
                *failed = item.is_err();
                std::future::ready(Some(item))
            });

        Ok(Box::pin(chunks))
    }
}
