// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock generation backend for deterministic testing.
//!
//! `MockGenerator` implements `GenerationAdapter` with scripted outcomes,
//! enabling fast, CI-runnable tests without external API calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use tokio::sync::Mutex;

use switchboard_core::traits::adapter::PluginAdapter;
use switchboard_core::traits::generation::{GenerationAdapter, TextStream};
use switchboard_core::types::{AdapterType, HealthStatus, Prompt};
use switchboard_core::SwitchboardError;

/// One scripted generation outcome.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Whole text; streamed word by word.
    Text(String),
    /// Explicit chunks; blocking mode returns them concatenated.
    Chunks(Vec<String>),
    /// Fails before producing anything.
    Fail(String),
    /// Streams the chunks, then fails. Blocking mode fails outright.
    FailAfter(Vec<String>, String),
    /// Streams the chunks, then never produces another item. Blocking mode hangs.
    Stall(Vec<String>),
}

/// A mock generator that plays back scripted outcomes.
///
/// Outcomes are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned.
#[derive(Default)]
pub struct MockGenerator {
    script: Mutex<VecDeque<Scripted>>,
    prompts: Mutex<Vec<Prompt>>,
    open_streams: Arc<AtomicUsize>,
}

/// Decrements the open-stream count when the stream it lives in is dropped.
struct StreamGuard(Arc<AtomicUsize>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock generator pre-loaded with plain text replies.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self::with_script(responses.into_iter().map(Scripted::Text).collect())
    }

    pub fn with_script(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Add an outcome to the end of the queue.
    pub async fn push(&self, outcome: Scripted) {
        self.script.lock().await.push_back(outcome);
    }

    /// Prompts received so far, in call order.
    pub async fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().await.clone()
    }

    /// Number of generation calls made.
    pub async fn calls(&self) -> usize {
        self.prompts.lock().await.len()
    }

    /// Streams handed out and not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    async fn next(&self, prompt: Prompt) -> Scripted {
        self.prompts.lock().await.push(prompt);
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Scripted::Text("mock response".to_string()))
    }
}

fn words(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl PluginAdapter for MockGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generation
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        Ok(())
    }
}

#[async_trait]
impl GenerationAdapter for MockGenerator {
    async fn complete(&self, prompt: Prompt) -> Result<String, SwitchboardError> {
        match self.next(prompt).await {
            Scripted::Text(text) => Ok(text),
            Scripted::Chunks(chunks) => Ok(chunks.concat()),
            Scripted::Fail(message) | Scripted::FailAfter(_, message) => {
                Err(SwitchboardError::generation(message))
            }
            Scripted::Stall(_) => {
                futures::future::pending::<()>().await;
                Err(SwitchboardError::generation("unreachable"))
            }
        }
    }

    async fn stream(&self, prompt: Prompt) -> Result<TextStream, SwitchboardError> {
        let (chunks, tail): (Vec<String>, Option<Result<(), String>>) = match self.next(prompt).await
        {
            Scripted::Text(text) => (words(&text), None),
            Scripted::Chunks(chunks) => (chunks, None),
            Scripted::Fail(message) => return Err(SwitchboardError::generation(message)),
            Scripted::FailAfter(chunks, message) => (chunks, Some(Err(message))),
            Scripted::Stall(chunks) => (chunks, Some(Ok(()))),
        };

        self.open_streams.fetch_add(1, Ordering::SeqCst);
        let guard = StreamGuard(self.open_streams.clone());

        let head = stream::iter(chunks.into_iter().map(Ok));
        let tail: TextStream = match tail {
            None => Box::pin(stream::empty()),
            Some(Err(message)) => Box::pin(stream::once(async move {
                Err(SwitchboardError::generation(message))
            })),
            Some(Ok(())) => Box::pin(stream::pending()),
        };

        Ok(Box::pin(head.chain(tail).map(move |item| {
            let _ = &guard;
            item
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(text: &str) -> Prompt {
        Prompt {
            system: "system".into(),
            history: vec![],
            message: text.into(),
        }
    }

    #[tokio::test]
    async fn returns_scripted_outcomes_in_order() {
        let generator = MockGenerator::with_script(vec![
            Scripted::Text("first".into()),
            Scripted::Fail("boom".into()),
        ]);
        assert_eq!(generator.complete(prompt("a")).await.unwrap(), "first");
        assert!(generator.complete(prompt("b")).await.is_err());
        assert_eq!(generator.complete(prompt("c")).await.unwrap(), "mock response");
        assert_eq!(generator.calls().await, 3);
        assert_eq!(generator.prompts().await[1].message, "b");
    }

    #[tokio::test]
    async fn text_streams_word_by_word() {
        let generator = MockGenerator::with_responses(vec!["one two three".into()]);
        let chunks: Vec<String> = generator
            .stream(prompt("x"))
            .await
            .unwrap()
            .map(Result::unwrap)
            .collect()
            .await;
        assert_eq!(chunks, vec!["one ", "two ", "three"]);
    }

    #[tokio::test]
    async fn fail_after_ends_with_error() {
        let generator = MockGenerator::with_script(vec![Scripted::FailAfter(
            vec!["par".into()],
            "cut".into(),
        )]);
        let items: Vec<_> = generator.stream(prompt("x")).await.unwrap().collect().await;
        assert_eq!(items.len(), 2);
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn open_streams_tracks_drops() {
        let generator = MockGenerator::with_script(vec![Scripted::Stall(vec!["a".into()])]);
        let stream = generator.stream(prompt("x")).await.unwrap();
        assert_eq!(generator.open_streams(), 1);
        drop(stream);
        assert_eq!(generator.open_streams(), 0);
    }
}
