// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for customer-facing delivery (web, SMS, WhatsApp).

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Channel, ChannelCapabilities, MessageId, OutboundMessage};

/// Outbound side of a channel.
///
/// The orchestration core stays channel-agnostic: it asks the adapter to
/// shape generated text into what will actually be delivered, persists that
/// shaped text, then hands it to [`send`](ChannelAdapter::send).
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// The channel this adapter delivers on.
    fn channel(&self) -> Channel;

    /// Returns the capabilities supported by this channel.
    fn capabilities(&self) -> ChannelCapabilities;

    /// Applies channel-specific formatting (e.g. length truncation).
    fn shape_reply(&self, text: &str) -> String {
        text.to_string()
    }

    /// Delivers a message and returns the vendor's message id.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, SwitchboardError>;
}
