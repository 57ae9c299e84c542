// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod channel;
pub mod classifier;
pub mod directory;
pub mod generation;
pub mod storage;

pub use adapter::PluginAdapter;
pub use channel::ChannelAdapter;
pub use classifier::IntentClassifier;
pub use directory::TenantDirectory;
pub use generation::{GenerationAdapter, TextStream};
pub use storage::StorageAdapter;
