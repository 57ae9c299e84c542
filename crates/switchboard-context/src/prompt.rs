// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly: preamble, industry guideline, trimmed history, current message.

use switchboard_core::types::{Industry, Message, Prompt, PromptRole, PromptTurn, Sender};
use tracing::debug;

use crate::guidelines::GuidelineTable;

/// Builds industry-aware prompts within a character budget.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    preamble: String,
    agent_name: String,
    guidelines: GuidelineTable,
    budget_chars: usize,
}

impl PromptBuilder {
    pub fn new(
        preamble: impl Into<String>,
        agent_name: impl Into<String>,
        guidelines: GuidelineTable,
        budget_chars: usize,
    ) -> Self {
        Self {
            preamble: preamble.into(),
            agent_name: agent_name.into(),
            guidelines,
            budget_chars,
        }
    }

    /// Assembles the prompt for one customer message.
    ///
    /// `history` is chronological and must not contain `message` itself. When
    /// the rendered prompt exceeds the budget, the oldest history turns are
    /// dropped first; the current message is always kept.
    pub fn build_prompt(
        &self,
        message: &str,
        industry: Industry,
        intent: Option<&str>,
        history: &[Message],
    ) -> Prompt {
        let mut system = format!(
            "{}\n\nYou are {}, answering on behalf of a {industry} provider.\n\n\
             Industry guidelines:\n{}",
            self.preamble.trim(),
            self.agent_name,
            self.guidelines.get(industry),
        );
        if let Some(intent) = intent {
            system.push_str(&format!("\n\nDetected customer intent: {intent}"));
        }

        let mut prompt = Prompt {
            system,
            history: history.iter().map(to_turn).collect(),
            message: message.to_string(),
        };

        let before = prompt.history.len();
        let mut over_budget = prompt.char_len().saturating_sub(self.budget_chars);
        let mut drop = 0;
        while over_budget > 0 && drop < prompt.history.len() {
            over_budget = over_budget.saturating_sub(turn_len(&prompt.history[drop]));
            drop += 1;
        }
        prompt.history.drain(..drop);

        if drop > 0 {
            debug!(
                dropped = drop,
                kept = before - drop,
                budget = self.budget_chars,
                "trimmed prompt history to fit budget"
            );
        }
        prompt
    }
}

fn to_turn(message: &Message) -> PromptTurn {
    let role = match message.sender {
        Sender::Customer => PromptRole::User,
        Sender::Ai | Sender::Agent | Sender::System => PromptRole::Assistant,
    };
    PromptTurn {
        role,
        content: message.content.clone(),
    }
}

/// Rendered size of one history turn, matching `Prompt::char_len`.
fn turn_len(turn: &PromptTurn) -> usize {
    let label = match turn.role {
        PromptRole::User => "Customer: ".len(),
        PromptRole::Assistant => "Assistant: ".len(),
    };
    label + turn.content.chars().count() + 1
}
