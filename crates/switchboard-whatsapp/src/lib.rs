// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Business channel adapter for Switchboard.
//!
//! The vendor retries any webhook that is not answered with 200, so every
//! POST is acknowledged with 200 whatever happens to its payload. Problems
//! are logged instead.

pub mod client;
pub mod signature;
pub mod types;
pub mod webhook;

use async_trait::async_trait;
use switchboard_core::SwitchboardError;
use switchboard_core::traits::adapter::PluginAdapter;
use switchboard_core::traits::channel::ChannelAdapter;
use switchboard_core::types::{
    AdapterType, Channel, ChannelCapabilities, HealthStatus, MessageId, OutboundMessage,
    WhatsAppCredentials,
};

pub use client::WhatsAppClient;
pub use webhook::{WhatsAppSettings, WhatsAppState, whatsapp_router};

/// Longest text body the Cloud API accepts.
pub const MAX_TEXT_LENGTH: usize = 4096;

/// WhatsApp delivery bound to one tenant's business number.
pub struct WhatsAppChannel {
    client: WhatsAppClient,
    company_id: String,
    credentials: WhatsAppCredentials,
}

impl WhatsAppChannel {
    pub fn new(
        client: WhatsAppClient,
        company_id: impl Into<String>,
        credentials: WhatsAppCredentials,
    ) -> Self {
        Self {
            client,
            company_id: company_id.into(),
            credentials,
        }
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
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
impl ChannelAdapter for WhatsAppChannel {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_streaming: false,
            max_message_length: Some(MAX_TEXT_LENGTH),
        }
    }

    fn shape_reply(&self, text: &str) -> String {
        text.chars().take(MAX_TEXT_LENGTH).collect()
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, SwitchboardError> {
        if msg
            .company_id
            .as_deref()
            .is_some_and(|company| company != self.company_id)
        {
            return Err(SwitchboardError::Validation(format!(
                "WhatsApp credentials of {} cannot send for another company",
                self.company_id
            )));
        }
        self.client
            .send_text(&self.credentials, &msg.recipient, &msg.text)
            .await
    }
}
