// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` and captures every outbound
//! message for later assertions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use switchboard_core::traits::adapter::PluginAdapter;
use switchboard_core::traits::channel::ChannelAdapter;
use switchboard_core::types::{
    AdapterType, Channel, ChannelCapabilities, HealthStatus, MessageId, OutboundMessage,
};
use switchboard_core::SwitchboardError;

/// A mock channel that records sends instead of delivering them.
pub struct MockChannel {
    channel: Channel,
    max_length: Option<usize>,
    fail_sends: AtomicBool,
    /// Messages captured from `send()` calls.
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl MockChannel {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            max_length: None,
            fail_sends: AtomicBool::new(false),
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Truncate shaped replies to `max` characters.
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Make subsequent sends fail with a channel error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Get all messages that were sent via this channel.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    /// Texts of all sent messages, in order.
    pub async fn sent_texts(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|m| m.text.clone()).collect()
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn channel(&self) -> Channel {
        self.channel
    }

    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_streaming: self.channel == Channel::Web,
            max_message_length: self.max_length,
        }
    }

    fn shape_reply(&self, text: &str) -> String {
        match self.max_length {
            Some(max) => text.chars().take(max).collect(),
            None => text.to_string(),
        }
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, SwitchboardError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(SwitchboardError::Channel {
                message: "mock send failure".into(),
                source: None,
            });
        }
        let id = format!("mock-msg-{}", uuid::Uuid::new_v4());
        self.sent.lock().await.push(msg);
        Ok(MessageId(id))
    }
}
