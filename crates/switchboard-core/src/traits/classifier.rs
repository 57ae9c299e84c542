// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent classifier seam.

use async_trait::async_trait;

use crate::types::{Industry, IntentResult};

/// Maps a customer message to an intent.
///
/// Implementations never fail outward: when nothing can be determined they
/// return [`IntentResult::general_inquiry`]. The rule-based classifier and a
/// model-backed one are interchangeable behind this trait.
#[async_trait]
pub trait IntentClassifier: Send + Sync + 'static {
    async fn detect_intent(&self, text: &str, industry: Industry) -> IntentResult;
}
