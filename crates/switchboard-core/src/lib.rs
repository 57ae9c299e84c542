// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Switchboard conversation engine.
//!
//! This crate provides the trait seams, error type, and domain types shared
//! by every other crate in the workspace. Channel, generation and storage
//! adapters all implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SwitchboardError;
pub use types::{
    AdapterType, Channel, ChannelCapabilities, ContextPatch, Conversation, ConversationContext,
    ConversationStatus, EscalationEntry, HealthStatus, InboundMessage, Industry, IntentResult,
    Message, MessageId, NewMessage, OutboundMessage, Prompt, PromptRole, PromptTurn, Sender,
    SmsCredentials, Tenant, WhatsAppCredentials,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    ChannelAdapter, GenerationAdapter, IntentClassifier, PluginAdapter, StorageAdapter,
    TenantDirectory, TextStream,
};
