// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Switchboard engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Identifier returned by a channel after an outbound message is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Generation,
    Storage,
    Observability,
}

/// Inbound/outbound channel a conversation lives on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Web,
    Sms,
    Whatsapp,
}

/// Tenant-configured vertical driving prompt guidelines and intent rules.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    Mobile,
    Banking,
    Microfinance,
    Insurance,
    Television,
}

/// Conversation lifecycle status.
///
/// Transitions are one-directional: `active -> escalated`, `active -> resolved`,
/// `escalated -> resolved`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Escalated,
    Resolved,
}

impl ConversationStatus {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: ConversationStatus) -> bool {
        use ConversationStatus::*;
        matches!(
            (self, next),
            (Active, Escalated) | (Active, Resolved) | (Escalated, Resolved)
        )
    }

    /// Open conversations (active or escalated) participate in the one-per-customer rule.
    pub fn is_open(self) -> bool {
        !matches!(self, ConversationStatus::Resolved)
    }
}

/// Author of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Customer,
    Ai,
    Agent,
    /// Canned hand-off and other engine-authored notices.
    System,
}

/// Free-form context carried by a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Most recently classified intent.
    #[serde(default)]
    pub intent: Option<String>,
    pub industry: Industry,
    #[serde(default)]
    pub custom_data: serde_json::Map<String, serde_json::Value>,
}

impl ConversationContext {
    pub fn new(industry: Industry) -> Self {
        Self {
            intent: None,
            industry,
            custom_data: serde_json::Map::new(),
        }
    }

    /// Shallow merge: each field present in the patch overwrites the stored one.
    /// `custom_data` merges per key.
    pub fn merge(&mut self, patch: ContextPatch) {
        if let Some(intent) = patch.intent {
            self.intent = Some(intent);
        }
        if let Some(industry) = patch.industry {
            self.industry = industry;
        }
        for (key, value) in patch.custom_data {
            self.custom_data.insert(key, value);
        }
    }
}

/// Partial update applied by `update_context`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextPatch {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub industry: Option<Industry>,
    #[serde(default)]
    pub custom_data: serde_json::Map<String, serde_json::Value>,
}

impl ContextPatch {
    pub fn intent(intent: impl Into<String>) -> Self {
        Self {
            intent: Some(intent.into()),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom_data.insert(key.into(), value);
        self
    }
}

/// A conversation between one customer and the system on one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub customer_id: String,
    pub channel: Channel,
    pub industry: Industry,
    pub company_id: Option<String>,
    pub status: ConversationStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub last_message_at: DateTime<Utc>,
    pub context: ConversationContext,
    pub assigned_agent: Option<String>,
    /// Consecutive generation failures since the last successful AI reply.
    pub generation_failures: u32,
    /// Number of messages appended so far; the next message gets `seq = message_count + 1`.
    pub message_count: i64,
    /// Ordered message log. Populated only by full conversation reads.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
}

/// A single message within a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    /// 1-based position in the conversation's append order.
    pub seq: i64,
    pub sender: Sender,
    pub content: String,
    pub intent: Option<String>,
    pub confidence: Option<f32>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Vendor message id (`wamid`, `MessageSid`). Unique within a conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// Input to `add_message`; id, seq and timestamp are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender: Sender,
    pub content: String,
    pub intent: Option<String>,
    pub confidence: Option<f32>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub external_id: Option<String>,
}

impl NewMessage {
    pub fn new(sender: Sender, content: impl Into<String>) -> Self {
        Self {
            sender,
            content: content.into(),
            intent: None,
            confidence: None,
            metadata: serde_json::Map::new(),
            external_id: None,
        }
    }

    pub fn customer(content: impl Into<String>) -> Self {
        Self::new(Sender::Customer, content)
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::new(Sender::Ai, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Sender::System, content)
    }

    pub fn with_intent(mut self, result: &IntentResult) -> Self {
        self.intent = Some(result.intent.clone());
        self.confidence = Some(result.confidence);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_external_id(mut self, external_id: Option<String>) -> Self {
        self.external_id = external_id;
        self
    }
}

/// Classified purpose of a customer message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

impl IntentResult {
    /// Intent tag used when no rule matches.
    pub const GENERAL_INQUIRY: &'static str = "general_inquiry";
    /// Confidence reported for the fallback intent.
    pub const DEFAULT_CONFIDENCE: f32 = 0.3;

    pub fn new(intent: impl Into<String>, confidence: f32) -> Self {
        Self {
            intent: intent.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Explicit low-confidence default, never absent.
    pub fn general_inquiry() -> Self {
        Self::new(Self::GENERAL_INQUIRY, Self::DEFAULT_CONFIDENCE)
    }
}

/// Canonical inbound message produced by every channel adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub channel: Channel,
    /// Canonical customer id (not the channel address).
    pub customer_id: String,
    /// Channel-native address replies go to (phone number, WhatsApp id).
    pub reply_to: String,
    pub industry: Industry,
    pub company_id: Option<String>,
    /// Explicit conversation target. Only the Web adapter supplies this.
    pub conversation_id: Option<String>,
    pub text: String,
    /// Vendor message id. A redelivery of the same id is not processed again.
    pub external_id: Option<String>,
}

/// An outbound message to be delivered by a channel adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub conversation_id: String,
    pub channel: Channel,
    /// Channel-native recipient address (phone number, WhatsApp id, web customer id).
    pub recipient: String,
    pub company_id: Option<String>,
    pub text: String,
}

/// Capabilities reported by a channel adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCapabilities {
    /// Whether the channel can consume incremental chunks.
    pub supports_streaming: bool,
    /// Maximum characters per delivered message, if bounded.
    pub max_message_length: Option<usize>,
}

/// Role of a history turn inside a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    User,
    Assistant,
}

/// One prior exchange kept in the prompt's history window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTurn {
    pub role: PromptRole,
    pub content: String,
}

/// A fully assembled prompt handed to the generation capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// Preamble plus industry guideline block.
    pub system: String,
    /// Trimmed history window, oldest first.
    pub history: Vec<PromptTurn>,
    /// The current customer message. Never dropped by trimming.
    pub message: String,
}

impl Prompt {
    /// Flatten to a single text block, for capabilities that take plain text.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.char_len());
        out.push_str(&self.system);
        out.push_str("\n\n");
        for turn in &self.history {
            out.push_str(match turn.role {
                PromptRole::User => "Customer: ",
                PromptRole::Assistant => "Assistant: ",
            });
            out.push_str(&turn.content);
            out.push('\n');
        }
        out.push_str("Customer: ");
        out.push_str(&self.message);
        out.push_str("\nAssistant:");
        out
    }

    /// Size of the rendered prompt in characters.
    pub fn char_len(&self) -> usize {
        let history: usize = self
            .history
            .iter()
            .map(|t| {
                let label = match t.role {
                    PromptRole::User => "Customer: ".len(),
                    PromptRole::Assistant => "Assistant: ".len(),
                };
                label + t.content.chars().count() + 1
            })
            .sum();
        self.system.chars().count()
            + 2
            + history
            + "Customer: ".len()
            + self.message.chars().count()
            + "\nAssistant:".len()
    }
}

/// SMS credentials owned by exactly one tenant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsCredentials {
    pub account_sid: String,
    pub auth_token: String,
    /// The tenant's sending/receiving number in E.164 form.
    pub from_number: String,
}

impl std::fmt::Debug for SmsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[redacted]")
            .field("from_number", &self.from_number)
            .finish()
    }
}

/// WhatsApp Business credentials owned by exactly one tenant.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsAppCredentials {
    pub phone_number_id: String,
    pub access_token: String,
}

impl std::fmt::Debug for WhatsAppCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppCredentials")
            .field("phone_number_id", &self.phone_number_id)
            .field("access_token", &"[redacted]")
            .finish()
    }
}

/// Strips formatting so `+1 (555) 000-1111` and `+15550001111` compare equal.
pub fn normalize_phone_number(number: &str) -> String {
    number
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// A tenant (company) with its industry and channel credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub company_id: String,
    pub industry: Industry,
    pub sms: Option<SmsCredentials>,
    pub whatsapp: Option<WhatsAppCredentials>,
}

/// Human-dispatch queue entry produced by an escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationEntry {
    pub id: i64,
    pub conversation_id: String,
    pub reason: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
}
