// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation orchestration for the Switchboard engine.
//!
//! - [`ConversationStore`]: lifecycle rules over the durable store, serialized per conversation
//! - [`Pipeline`]: classify, apply the escalation policy, generate, store, dispatch
//! - [`ConfigDirectory`]: tenant lookup by company, WhatsApp number id or SMS number
//! - [`shutdown`]: signal handling and stream draining

pub mod directory;
pub mod pipeline;
pub mod shutdown;
pub mod store;

pub use directory::ConfigDirectory;
pub use pipeline::{
    Pipeline, PipelineSettings, StreamItem, StreamingTurn, TurnKind, TurnOutcome,
};
pub use store::{Appended, ConversationStore, EscalateOutcome};
