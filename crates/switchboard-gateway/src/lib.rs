// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Switchboard engine.
//!
//! The web chat endpoint streams replies over SSE through [`WebChannel`],
//! which implements the same `ChannelAdapter` trait as SMS and WhatsApp.
//! The SMS and WhatsApp webhook routers are mounted alongside the health,
//! metrics and dashboard routes.

pub mod handlers;
pub mod server;
pub mod sse;

use async_trait::async_trait;

use switchboard_core::SwitchboardError;
use switchboard_core::traits::adapter::PluginAdapter;
use switchboard_core::traits::channel::ChannelAdapter;
use switchboard_core::types::{
    AdapterType, Channel, ChannelCapabilities, HealthStatus, MessageId, OutboundMessage,
};

pub use server::{GatewayState, HealthState, ServerConfig, build_router, start_server};

/// Web chat channel.
///
/// Replies travel on the SSE response of the request that produced them, so
/// the adapter only reports capabilities. `send` is never reached by the
/// streaming pipeline and acknowledges without delivering.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebChannel;

#[async_trait]
impl PluginAdapter for WebChannel {
    fn name(&self) -> &str {
        "web"
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
impl ChannelAdapter for WebChannel {
    fn channel(&self) -> Channel {
        Channel::Web
    }

    fn capabilities(&self) -> ChannelCapabilities {
        ChannelCapabilities {
            supports_streaming: true,
            max_message_length: None,
        }
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, SwitchboardError> {
        tracing::debug!(
            conversation_id = %msg.conversation_id,
            "web replies are delivered on the open event stream"
        );
        Ok(MessageId(uuid::Uuid::new_v4().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_channel_identity() {
        let channel = WebChannel;
        assert_eq!(channel.name(), "web");
        assert_eq!(channel.adapter_type(), AdapterType::Channel);
        assert_eq!(channel.channel(), Channel::Web);
    }

    #[test]
    fn web_channel_streams_without_length_limit() {
        let caps = WebChannel.capabilities();
        assert!(caps.supports_streaming);
        assert!(caps.max_message_length.is_none());
        assert_eq!(WebChannel.shape_reply("unchanged"), "unchanged");
    }

    #[tokio::test]
    async fn web_send_acknowledges() {
        let id = WebChannel
            .send(OutboundMessage {
                conversation_id: "c1".into(),
                channel: Channel::Web,
                recipient: "cust-1".into(),
                company_id: None,
                text: "hi".into(),
            })
            .await
            .unwrap();
        assert!(!id.0.is_empty());
    }
}
