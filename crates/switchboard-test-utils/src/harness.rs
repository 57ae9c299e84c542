// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete orchestration stack with a mock
//! generator, mock channels and a temp SQLite database. Provides `send()`
//! and `stream()` to drive the full pipeline in tests.

use std::sync::Arc;
use std::time::Duration;

use switchboard_agent::{ConversationStore, Pipeline, PipelineSettings, StreamItem, StreamingTurn, TurnOutcome};
use switchboard_config::model::{StorageConfig, SwitchboardConfig};
use switchboard_context::{GuidelineTable, PromptBuilder, ResponseGenerator};
use switchboard_core::types::{Channel, InboundMessage, Industry};
use switchboard_core::{StorageAdapter, SwitchboardError};
use switchboard_router::{EscalationPolicy, RuleClassifier};
use switchboard_storage::SqliteStorage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::mock_channel::MockChannel;
use crate::mock_generator::{MockGenerator, Scripted};

/// Company id every harness message is attributed to.
pub const TEST_COMPANY: &str = "acme";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    script: Vec<Scripted>,
    config: SwitchboardConfig,
    timeout: Duration,
    chunk_timeout: Duration,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            script: Vec::new(),
            config: SwitchboardConfig::default(),
            timeout: Duration::from_secs(5),
            chunk_timeout: Duration::from_secs(2),
        }
    }

    /// Plain text replies, one per generation call.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.script
            .extend(responses.into_iter().map(Scripted::Text));
        self
    }

    /// Arbitrary scripted generation outcomes.
    pub fn with_script(mut self, script: Vec<Scripted>) -> Self {
        self.script.extend(script);
        self
    }

    /// Adjust the configuration before the stack is wired.
    pub fn with_config(mut self, edit: impl FnOnce(&mut SwitchboardConfig)) -> Self {
        edit(&mut self.config);
        self
    }

    /// Generation timeouts. Sub-second values keep stall tests fast.
    pub fn with_timeouts(mut self, timeout: Duration, chunk_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.chunk_timeout = chunk_timeout;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, SwitchboardError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| SwitchboardError::Storage {
            source: e.into(),
        })?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        };

        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);
        let store = Arc::new(ConversationStore::new(storage));

        let generator = Arc::new(MockGenerator::with_script(self.script));
        let prompts = PromptBuilder::new(
            config.agent.preamble.clone(),
            config.agent.name.clone(),
            GuidelineTable::from_config(&config.guidelines)?,
            config.prompt.budget_chars,
        );
        let responder = ResponseGenerator::new(
            generator.clone(),
            prompts,
            self.timeout,
            self.chunk_timeout,
        );

        let pipeline = Arc::new(Pipeline::new(
            store.clone(),
            Arc::new(RuleClassifier::new()),
            EscalationPolicy::from_config(&config.escalation)?,
            responder,
            PipelineSettings::from_config(&config),
        ));

        Ok(TestHarness {
            generator,
            web: Arc::new(MockChannel::new(Channel::Web)),
            sms: Arc::new(MockChannel::new(Channel::Sms)),
            whatsapp: Arc::new(MockChannel::new(Channel::Whatsapp)),
            store,
            pipeline,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock adapters and temp storage.
pub struct TestHarness {
    /// The scripted generation backend.
    pub generator: Arc<MockGenerator>,
    pub web: Arc<MockChannel>,
    pub sms: Arc<MockChannel>,
    pub whatsapp: Arc<MockChannel>,
    pub store: Arc<ConversationStore>,
    pub pipeline: Arc<Pipeline>,
    /// The configuration the stack was wired from.
    pub config: SwitchboardConfig,
    /// Kept alive so the database outlives the harness.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// The mock channel for `channel`.
    pub fn channel(&self, channel: Channel) -> &Arc<MockChannel> {
        match channel {
            Channel::Web => &self.web,
            Channel::Sms => &self.sms,
            Channel::Whatsapp => &self.whatsapp,
        }
    }

    /// An inbound message from `customer` on `channel`, attributed to a
    /// mobile provider.
    pub fn inbound(&self, channel: Channel, customer: &str, text: &str) -> InboundMessage {
        InboundMessage {
            channel,
            customer_id: customer.to_string(),
            reply_to: customer.to_string(),
            industry: Industry::Mobile,
            company_id: Some(TEST_COMPANY.to_string()),
            conversation_id: None,
            text: text.to_string(),
            external_id: None,
        }
    }

    /// Runs a blocking turn on `channel`.
    pub async fn send(
        &self,
        channel: Channel,
        customer: &str,
        text: &str,
    ) -> Result<TurnOutcome, SwitchboardError> {
        let inbound = self.inbound(channel, customer, text);
        self.pipeline
            .handle(inbound, self.channel(channel).as_ref())
            .await
    }

    /// Runs a streaming web turn with a fresh cancellation token.
    pub async fn stream(
        &self,
        customer: &str,
        text: &str,
    ) -> Result<StreamingTurn, SwitchboardError> {
        self.stream_with(self.inbound(Channel::Web, customer, text), CancellationToken::new())
            .await
    }

    pub async fn stream_with(
        &self,
        inbound: InboundMessage,
        cancel: CancellationToken,
    ) -> Result<StreamingTurn, SwitchboardError> {
        self.pipeline
            .handle_streaming(inbound, self.web.as_ref(), cancel)
            .await
    }
}

/// Drains a streamed turn until the channel closes.
pub async fn collect_items(mut items: mpsc::Receiver<StreamItem>) -> Vec<StreamItem> {
    let mut out = Vec::new();
    while let Some(item) = items.recv().await {
        out.push(item);
    }
    out
}

/// Concatenated chunk text of a drained stream.
pub fn chunk_text(items: &[StreamItem]) -> String {
    items
        .iter()
        .filter_map(|item| match item {
            StreamItem::Chunk(text) => Some(text.as_str()),
            StreamItem::Done => None,
        })
        .collect()
}
