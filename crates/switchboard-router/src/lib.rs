// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intent classification and escalation policy for the Switchboard engine.
//!
//! This crate provides:
//! - [`RuleClassifier`]: industry-scoped keyword rules behind the
//!   [`IntentClassifier`](switchboard_core::IntentClassifier) seam
//! - [`EscalationPolicy`]: the pure hand-off decision
//!
//! Both run before any generation call, so neither does I/O.

pub mod classifier;
pub mod policy;

pub use classifier::{IntentRule, RuleClassifier};
pub use policy::{EscalationDecision, EscalationPolicy, EscalationReason};
