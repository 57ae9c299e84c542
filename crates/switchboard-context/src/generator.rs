// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response generation with bounded waits.
//!
//! Blocking calls are bounded by one overall timeout. Streams are bounded by
//! the same timeout for the first byte to arrive from the backend, then by a
//! per-chunk stall timeout. Every failure is surfaced as a terminal `Err`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use switchboard_config::model::SwitchboardConfig;
use switchboard_core::types::{Industry, Message, Prompt};
use switchboard_core::{GenerationAdapter, SwitchboardError, TextStream};
use tracing::{debug, warn};

use crate::guidelines::GuidelineTable;
use crate::prompt::PromptBuilder;

/// Builds prompts and drives the generation backend.
#[derive(Clone)]
pub struct ResponseGenerator {
    backend: Arc<dyn GenerationAdapter>,
    prompts: PromptBuilder,
    timeout: Duration,
    chunk_timeout: Duration,
}

impl ResponseGenerator {
    pub fn new(
        backend: Arc<dyn GenerationAdapter>,
        prompts: PromptBuilder,
        timeout: Duration,
        chunk_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            prompts,
            timeout,
            chunk_timeout,
        }
    }

    /// Wires a generator from the `[agent]`, `[prompt]`, `[generation]` and
    /// `[guidelines]` sections.
    pub fn from_config(
        config: &SwitchboardConfig,
        backend: Arc<dyn GenerationAdapter>,
    ) -> Result<Self, SwitchboardError> {
        let guidelines = GuidelineTable::from_config(&config.guidelines)?;
        let prompts = PromptBuilder::new(
            config.agent.preamble.clone(),
            config.agent.name.clone(),
            guidelines,
            config.prompt.budget_chars,
        );
        Ok(Self::new(
            backend,
            prompts,
            Duration::from_secs(config.generation.timeout_secs),
            Duration::from_secs(config.generation.chunk_timeout_secs),
        ))
    }

    /// See [`PromptBuilder::build_prompt`].
    pub fn build_prompt(
        &self,
        message: &str,
        industry: Industry,
        intent: Option<&str>,
        history: &[Message],
    ) -> Prompt {
        self.prompts.build_prompt(message, industry, intent, history)
    }

    /// Generates the whole reply in one call.
    pub async fn generate_response(&self, prompt: Prompt) -> Result<String, SwitchboardError> {
        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.backend.complete(prompt)).await
        {
            Ok(result) => result,
            Err(_) => Err(SwitchboardError::Timeout {
                duration: self.timeout,
            }),
        };

        match &result {
            Ok(text) => {
                let elapsed = started.elapsed().as_secs_f64();
                switchboard_prometheus::record_generation_latency("complete", elapsed);
                debug!(chars = text.chars().count(), elapsed, "generation completed");
            }
            Err(e) => {
                switchboard_prometheus::record_generation_failure("complete");
                warn!(error = %e, "generation failed");
            }
        }
        result
    }

    /// Starts a streaming generation.
    ///
    /// Chunks are forwarded as they arrive; empty chunks are skipped. After a
    /// terminal `Err` the stream yields nothing more. Dropping the returned
    /// stream drops the backend stream with it.
    pub async fn generate_streaming_response(
        &self,
        prompt: Prompt,
    ) -> Result<TextStream, SwitchboardError> {
        let started = Instant::now();
        let inner = match tokio::time::timeout(self.timeout, self.backend.stream(prompt)).await {
            Ok(Ok(inner)) => inner,
            Ok(Err(e)) => {
                switchboard_prometheus::record_generation_failure("stream");
                warn!(error = %e, "failed to open generation stream");
                return Err(e);
            }
            Err(_) => {
                switchboard_prometheus::record_generation_failure("stream");
                warn!(timeout = ?self.timeout, "generation stream did not open in time");
                return Err(SwitchboardError::Timeout {
                    duration: self.timeout,
                });
            }
        };

        let state = StreamState {
            inner: Some(inner),
            chunk_timeout: self.chunk_timeout,
            started,
        };
        Ok(Box::pin(futures::stream::unfold(state, next_chunk)))
    }
}

struct StreamState {
    /// `None` once the stream has ended or failed.
    inner: Option<TextStream>,
    chunk_timeout: Duration,
    started: Instant,
}

async fn next_chunk(
    mut state: StreamState,
) -> Option<(Result<String, SwitchboardError>, StreamState)> {
    loop {
        let inner = state.inner.as_mut()?;
        match tokio::time::timeout(state.chunk_timeout, inner.next()).await {
            Ok(Some(Ok(chunk))) if chunk.is_empty() => continue,
            Ok(Some(Ok(chunk))) => return Some((Ok(chunk), state)),
            Ok(Some(Err(e))) => {
                state.inner = None;
                switchboard_prometheus::record_generation_failure("stream");
                warn!(error = %e, "generation stream failed");
                return Some((Err(e), state));
            }
            Ok(None) => {
                state.inner = None;
                let elapsed = state.started.elapsed().as_secs_f64();
                switchboard_prometheus::record_generation_latency("stream", elapsed);
                debug!(elapsed, "generation stream completed");
                return None;
            }
            Err(_) => {
                state.inner = None;
                switchboard_prometheus::record_generation_failure("stream");
                warn!(timeout = ?state.chunk_timeout, "generation stream stalled");
                return Some((
                    Err(SwitchboardError::Timeout {
                        duration: state.chunk_timeout,
                    }),
                    state,
                ));
            }
        }
    }
}
