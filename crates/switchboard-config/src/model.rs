// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Switchboard conversation engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use switchboard_core::types::{Industry, SmsCredentials, Tenant, WhatsAppCredentials};

/// Top-level Switchboard configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchboardConfig {
    /// Engine identity, log level and canned texts.
    #[serde(default)]
    pub agent: AgentConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Anthropic API settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Generation timeouts.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Prompt assembly settings.
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Escalation policy settings.
    #[serde(default)]
    pub escalation: EscalationConfig,

    /// SMS channel settings.
    #[serde(default)]
    pub sms: SmsConfig,

    /// WhatsApp channel settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Web widget settings.
    #[serde(default)]
    pub web: WebConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Industry-keyed guideline blocks, keyed by lowercase industry name.
    #[serde(default = "default_guidelines")]
    pub guidelines: BTreeMap<String, String>,

    /// Tenants and their channel credentials.
    #[serde(default)]
    pub tenants: Vec<TenantConfig>,
}

impl Default for SwitchboardConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::default(),
            anthropic: AnthropicConfig::default(),
            generation: GenerationConfig::default(),
            prompt: PromptConfig::default(),
            escalation: EscalationConfig::default(),
            sms: SmsConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            web: WebConfig::default(),
            prometheus: PrometheusConfig::default(),
            guidelines: default_guidelines(),
            tenants: Vec::new(),
        }
    }
}

/// Engine identity and canned-text configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name used in the prompt preamble.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Role preamble placed at the top of every prompt.
    #[serde(default = "default_preamble")]
    pub preamble: String,

    /// Fixed text sent when a conversation is handed to a human.
    #[serde(default = "default_handoff_message")]
    pub handoff_message: String,

    /// Static text substituted when generation fails.
    #[serde(default = "default_apology_message")]
    pub apology_message: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            preamble: default_preamble(),
            handoff_message: default_handoff_message(),
            apology_message: default_apology_message(),
        }
    }
}

fn default_agent_name() -> String {
    "Switchboard".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_preamble() -> String {
    "You are a friendly, concise customer support assistant. Answer the customer's \
     question directly, never invent account details, and keep replies short enough \
     for a phone screen."
        .to_string()
}

fn default_handoff_message() -> String {
    "I'm connecting you with a member of our support team. An agent will reply \
     here shortly."
        .to_string()
}

fn default_apology_message() -> String {
    "Sorry, I'm having trouble answering right now. Please try again in a moment."
        .to_string()
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind to.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_gateway_port")]
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("switchboard").join("switchboard.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("switchboard.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Anthropic API configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` falls back to `ANTHROPIC_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for replies.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// API base URL.
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            base_url: default_anthropic_base_url(),
        }
    }
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn default_model() -> String {
    "claude-haiku-4-5".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

/// Timeouts bounding calls to the generation capability.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Deadline for a blocking generation call.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Maximum wait between two streamed chunks before the stream is treated as stalled.
    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_generation_timeout(),
            chunk_timeout_secs: default_chunk_timeout(),
        }
    }
}

fn default_generation_timeout() -> u64 {
    30
}

fn default_chunk_timeout() -> u64 {
    15
}

/// Prompt assembly configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    /// Upper bound on rendered prompt size, in characters.
    #[serde(default = "default_budget_chars")]
    pub budget_chars: usize,

    /// Number of most recent messages loaded as history.
    #[serde(default = "default_history_limit")]
    pub history_limit: i64,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            budget_chars: default_budget_chars(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_budget_chars() -> usize {
    6000
}

fn default_history_limit() -> i64 {
    20
}

/// Escalation policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscalationConfig {
    /// Intents classified below this confidence are handed to a human.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Phrases that escalate regardless of classification. Matched case-insensitively
    /// at a word start.
    #[serde(default = "default_triggers")]
    pub triggers: Vec<String>,

    /// Intents that always escalate.
    #[serde(default = "default_always_escalate")]
    pub always_escalate: Vec<String>,

    /// Consecutive generation failures that auto-escalate a conversation.
    #[serde(default = "default_max_generation_failures")]
    pub max_generation_failures: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            triggers: default_triggers(),
            always_escalate: default_always_escalate(),
            max_generation_failures: default_max_generation_failures(),
        }
    }
}

fn default_confidence_threshold() -> f32 {
    0.4
}

fn default_triggers() -> Vec<String> {
    [
        "agent",
        "human",
        "manager",
        "complain",
        "supervisor",
        "representative",
        "real person",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_always_escalate() -> Vec<String> {
    ["fraud_report", "security_concern", "identity_theft"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_generation_failures() -> u32 {
    3
}

/// SMS channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsConfig {
    /// Maximum characters per outbound SMS, marker included.
    #[serde(default = "default_sms_max_length")]
    pub max_length: usize,

    /// Appended to truncated replies.
    #[serde(default = "default_continuation_marker")]
    pub continuation_marker: String,

    /// Base URL of the Twilio-compatible messaging API.
    #[serde(default = "default_sms_api_base_url")]
    pub api_base_url: String,

    /// Timeout for outbound API calls.
    #[serde(default = "default_outbound_timeout")]
    pub timeout_secs: u64,

    /// Check `X-Twilio-Signature` on inbound webhooks.
    #[serde(default)]
    pub validate_signatures: bool,

    /// Public URL Twilio posts to, used for signature validation.
    #[serde(default)]
    pub webhook_url: Option<String>,
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            max_length: default_sms_max_length(),
            continuation_marker: default_continuation_marker(),
            api_base_url: default_sms_api_base_url(),
            timeout_secs: default_outbound_timeout(),
            validate_signatures: false,
            webhook_url: None,
        }
    }
}

fn default_sms_max_length() -> usize {
    300
}

fn default_continuation_marker() -> String {
    "...".to_string()
}

fn default_sms_api_base_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_outbound_timeout() -> u64 {
    10
}

/// WhatsApp Business channel configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Token the vendor echoes during the GET subscription handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// App secret for `X-Hub-Signature-256` validation. `None` disables the check.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Graph API base URL, version segment included.
    #[serde(default = "default_whatsapp_api_base_url")]
    pub api_base_url: String,

    /// Timeout for outbound API calls.
    #[serde(default = "default_outbound_timeout")]
    pub timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            verify_token: None,
            app_secret: None,
            api_base_url: default_whatsapp_api_base_url(),
            timeout_secs: default_outbound_timeout(),
        }
    }
}

impl std::fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("app_secret", &self.app_secret.as_ref().map(|_| "[redacted]"))
            .field("api_base_url", &self.api_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_whatsapp_api_base_url() -> String {
    "https://graph.facebook.com/v21.0".to_string()
}

/// Web widget configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebConfig {
    /// Company attached to web conversations.
    #[serde(default)]
    pub default_company_id: Option<String>,
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Serve `/metrics` and record pipeline counters.
    #[serde(default = "default_prometheus_enabled")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: default_prometheus_enabled(),
        }
    }
}

fn default_prometheus_enabled() -> bool {
    true
}

/// Built-in guideline blocks, one per supported industry.
pub fn default_guidelines() -> BTreeMap<String, String> {
    [
        (
            "mobile",
            "Mobile network support: help with airtime and data balances, bundles, \
             top-ups, SIM swaps and coverage issues. Never read out full SIM or PUK \
             numbers.",
        ),
        (
            "banking",
            "Retail banking support: help with balances, transfers, cards, statements \
             and branch information. Never ask for a full card number, PIN or password.",
        ),
        (
            "microfinance",
            "Microfinance support: help with loan applications, repayment schedules, \
             group savings and disbursement status. Explain fees and interest plainly.",
        ),
        (
            "insurance",
            "Insurance support: help with policy details, premiums, claims status and \
             cover questions. Do not promise a claim outcome.",
        ),
        (
            "television",
            "Pay-TV support: help with subscriptions, packages, decoder errors and \
             renewals. Walk through decoder resets step by step.",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// A tenant with its industry and channel credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TenantConfig {
    /// Unique company identifier.
    pub company_id: String,

    /// Industry driving guidelines and intent rules.
    pub industry: Industry,

    /// SMS credentials owned by this tenant.
    #[serde(default)]
    pub sms: Option<TenantSmsConfig>,

    /// WhatsApp Business credentials owned by this tenant.
    #[serde(default)]
    pub whatsapp: Option<TenantWhatsAppConfig>,
}

impl TenantConfig {
    /// Converts into the engine's tenant representation.
    pub fn to_tenant(&self) -> Tenant {
        Tenant {
            company_id: self.company_id.clone(),
            industry: self.industry,
            sms: self.sms.as_ref().map(|s| SmsCredentials {
                account_sid: s.account_sid.clone(),
                auth_token: s.auth_token.clone(),
                from_number: s.from_number.clone(),
            }),
            whatsapp: self.whatsapp.as_ref().map(|w| WhatsAppCredentials {
                phone_number_id: w.phone_number_id.clone(),
                access_token: w.access_token.clone(),
            }),
        }
    }
}

/// Per-tenant SMS credentials.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TenantSmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

impl std::fmt::Debug for TenantSmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantSmsConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[redacted]")
            .field("from_number", &self.from_number)
            .finish()
    }
}

/// Per-tenant WhatsApp Business credentials.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TenantWhatsAppConfig {
    pub phone_number_id: String,
    pub access_token: String,
}

impl std::fmt::Debug for TenantWhatsAppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantWhatsAppConfig")
            .field("phone_number_id", &self.phone_number_id)
            .field("access_token", &"[redacted]")
            .finish()
    }
}
