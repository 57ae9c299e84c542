// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMS channel adapter for Switchboard.
//!
//! Inbound messages arrive as Twilio form webhooks on `/webhooks/sms`.
//! Replies are generated with the blocking generator, truncated to the SMS
//! length limit, stored as truncated, and sent through the Twilio REST API
//! with the owning tenant's credentials.

pub mod client;
pub mod format;
pub mod signature;
pub mod types;
pub mod webhook;

use async_trait::async_trait;
use switchboard_core::SwitchboardError;
use switchboard_core::traits::adapter::PluginAdapter;
use switchboard_core::traits::channel::ChannelAdapter;
use switchboard_core::types::{
    AdapterType, Channel, ChannelCapabilities, HealthStatus, MessageId, OutboundMessage,
    SmsCredentials,
};

pub use client::TwilioClient;
pub use webhook::{SmsSettings, SmsState, sms_router};

/// SMS delivery bound to one tenant's credentials.
///
/// Built per inbound webhook, so a reply can only ever leave from the number
/// that received the message.
pub struct SmsChannel {
    client: TwilioClient,
    company_id: String,
    credentials: SmsCredentials,
    max_length: usize,
    continuation_marker: String,
}

impl SmsChannel {
    pub fn new(
        client: TwilioClient,
        company_id: impl Into<String>,
        credentials: SmsCredentials,
        settings: &SmsSettings,
    ) -> Self {
        Self {
            client,
            company_id: company_id.into(),
            credentials,
            max_length: settings.max_length,
            continuation_marker: settings.continuation_marker.clone(),
        }
    }
}

#[async_trait]
impl PluginAdapter for SmsChannel {
    fn name(&self) -> &str {
        "sms"
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
impl ChannelAdapter for SmsChannel {
    fn channel(&self) -> Channel {
        Channel::Sms
    }

    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_streaming: false,
            max_message_length: Some(self.max_length),
        }
    }

    fn shape_reply(&self, text: &str) -> String {
        format::truncate_reply(text, self.max_length, &self.continuation_marker)
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, SwitchboardError> {
        if msg
            .company_id
            .as_deref()
            .is_some_and(|company| company != self.company_id)
        {
            return Err(SwitchboardError::Validation(format!(
                "SMS credentials of {} cannot send for another company",
                self.company_id
            )));
        }
        self.client
            .send_message(&self.credentials, &msg.recipient, &msg.text)
            .await
    }
}
