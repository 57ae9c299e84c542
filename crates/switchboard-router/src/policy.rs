// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation policy: a pure decision over (intent result, raw text).
//!
//! Decision order:
//! 1. explicit trigger phrase in the raw text
//! 2. intent in the always-escalate set
//! 3. confidence below the threshold
//!
//! Otherwise the AI keeps the conversation.

use std::collections::HashSet;

use regex::Regex;
use switchboard_config::model::EscalationConfig;
use switchboard_core::SwitchboardError;
use switchboard_core::types::IntentResult;

/// Why a message was handed to a human.
#[derive(Debug, Clone, PartialEq)]
pub enum EscalationReason {
    /// The customer asked for a person (or complained) in so many words.
    TriggerPhrase(String),
    /// The classified intent always goes to a human.
    AlwaysEscalate(String),
    /// The classifier was not confident enough.
    LowConfidence { confidence: f32, threshold: f32 },
    /// Generation kept failing for this conversation.
    RepeatedGenerationFailure(u32),
}

impl EscalationReason {
    /// Stable label used in logs, metrics and the dispatch queue.
    pub fn label(&self) -> &'static str {
        match self {
            EscalationReason::TriggerPhrase(_) => "trigger_phrase",
            EscalationReason::AlwaysEscalate(_) => "always_escalate",
            EscalationReason::LowConfidence { .. } => "low_confidence",
            EscalationReason::RepeatedGenerationFailure(_) => "generation_failures",
        }
    }
}

impl std::fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EscalationReason::TriggerPhrase(p) => write!(f, "trigger phrase `{p}`"),
            EscalationReason::AlwaysEscalate(i) => write!(f, "intent `{i}` always escalates"),
            EscalationReason::LowConfidence {
                confidence,
                threshold,
            } => write!(f, "confidence {confidence:.2} below {threshold:.2}"),
            EscalationReason::RepeatedGenerationFailure(n) => {
                write!(f, "{n} consecutive generation failures")
            }
        }
    }
}

/// Outcome of the policy for one customer message.
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationDecision {
    pub escalate: bool,
    pub reason: Option<EscalationReason>,
}

impl EscalationDecision {
    fn continue_with_ai() -> Self {
        Self {
            escalate: false,
            reason: None,
        }
    }

    fn escalate(reason: EscalationReason) -> Self {
        Self {
            escalate: true,
            reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone)]
struct Trigger {
    phrase: String,
    pattern: Regex,
}

/// Configured escalation policy. Holds no mutable state.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    triggers: Vec<Trigger>,
    always_escalate: HashSet<String>,
    confidence_threshold: f32,
}

impl EscalationPolicy {
    /// Builds a policy from explicit trigger phrases, always-escalate intents and threshold.
    ///
    /// Triggers match case-insensitively at a word start, so `complain` also
    /// catches `complaint`. Inner whitespace in a phrase matches any whitespace run.
    pub fn new(
        triggers: &[String],
        always_escalate: &[String],
        confidence_threshold: f32,
    ) -> Result<Self, SwitchboardError> {
        let triggers = triggers
            .iter()
            .map(|phrase| {
                let body = phrase
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s+");
                Regex::new(&format!(r"(?i)\b{body}"))
                    .map(|pattern| Trigger {
                        phrase: phrase.trim().to_lowercase(),
                        pattern,
                    })
                    .map_err(|e| {
                        SwitchboardError::Config(format!("invalid escalation trigger `{phrase}`: {e}"))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            triggers,
            always_escalate: always_escalate.iter().cloned().collect(),
            confidence_threshold,
        })
    }

    /// Builds the policy from the `[escalation]` config section.
    pub fn from_config(config: &EscalationConfig) -> Result<Self, SwitchboardError> {
        Self::new(
            &config.triggers,
            &config.always_escalate,
            config.confidence_threshold,
        )
    }

    /// Evaluates the policy and reports the deciding reason.
    pub fn evaluate(&self, intent: &IntentResult, raw_text: &str) -> EscalationDecision {
        if let Some(trigger) = self.triggers.iter().find(|t| t.pattern.is_match(raw_text)) {
            return EscalationDecision::escalate(EscalationReason::TriggerPhrase(
                trigger.phrase.clone(),
            ));
        }

        if self.always_escalate.contains(&intent.intent) {
            return EscalationDecision::escalate(EscalationReason::AlwaysEscalate(
                intent.intent.clone(),
            ));
        }

        if intent.confidence < self.confidence_threshold {
            return EscalationDecision::escalate(EscalationReason::LowConfidence {
                confidence: intent.confidence,
                threshold: self.confidence_threshold,
            });
        }

        EscalationDecision::continue_with_ai()
    }

    /// Whether this message should go to a human.
    pub fn should_escalate(&self, intent: &IntentResult, raw_text: &str) -> bool {
        self.evaluate(intent, raw_text).escalate
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }
}
