// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade, so calls are no-ops until a recorder is
//! installed.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all Switchboard metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "switchboard_messages_total",
        "Inbound customer messages processed, by channel"
    );
    describe_counter!(
        "switchboard_replies_total",
        "Replies delivered to customers, by channel"
    );
    describe_counter!(
        "switchboard_escalations_total",
        "Conversations escalated to a human agent, by reason"
    );
    describe_counter!(
        "switchboard_generation_failures_total",
        "Failed or timed-out generation calls, by mode"
    );
    describe_counter!(
        "switchboard_intents_total",
        "Detected intents, by intent label"
    );
    describe_gauge!(
        "switchboard_open_conversations",
        "Conversations currently active or escalated"
    );
    describe_histogram!(
        "switchboard_generation_latency_seconds",
        "Generation latency in seconds, by mode"
    );
}

/// Record an inbound customer message.
pub fn record_message(channel: &str) {
    metrics::counter!("switchboard_messages_total", "channel" => channel.to_string()).increment(1);
}

/// Record a delivered reply.
pub fn record_reply(channel: &str) {
    metrics::counter!("switchboard_replies_total", "channel" => channel.to_string()).increment(1);
}

/// Record an escalation.
pub fn record_escalation(reason: &str) {
    metrics::counter!("switchboard_escalations_total", "reason" => reason.to_string())
        .increment(1);
}

/// Record a generation failure. `mode` is `complete` or `stream`.
pub fn record_generation_failure(mode: &'static str) {
    metrics::counter!("switchboard_generation_failures_total", "mode" => mode).increment(1);
}

/// Record a detected intent.
pub fn record_intent(intent: &str) {
    metrics::counter!("switchboard_intents_total", "intent" => intent.to_string()).increment(1);
}

/// Set the number of open conversations.
pub fn set_open_conversations(count: f64) {
    metrics::gauge!("switchboard_open_conversations").set(count);
}

/// Record generation latency.
pub fn record_generation_latency(mode: &'static str, seconds: f64) {
    metrics::histogram!("switchboard_generation_latency_seconds", "mode" => mode).record(seconds);
}
