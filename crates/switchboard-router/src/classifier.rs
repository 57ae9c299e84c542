// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rule-based intent classification.
//!
//! Each industry carries a table of keyword rules, checked together with a
//! table shared by all industries. No model call, no network, no latency.

use async_trait::async_trait;
use switchboard_core::IntentClassifier;
use switchboard_core::types::{Industry, IntentResult};

/// Upper bound for rule-derived confidence. Keyword rules are never certain.
const MAX_RULE_CONFIDENCE: f32 = 0.95;

/// Confidence added for every additional pattern of the same rule that matches.
const EXTRA_MATCH_BONUS: f32 = 0.1;

/// One intent and the phrases that signal it.
#[derive(Debug)]
pub struct IntentRule {
    pub intent: &'static str,
    /// Lowercase phrases matched on word boundaries.
    pub patterns: &'static [&'static str],
    /// Confidence when exactly one pattern matches.
    pub base_score: f32,
}

const fn rule(
    intent: &'static str,
    patterns: &'static [&'static str],
    base_score: f32,
) -> IntentRule {
    IntentRule {
        intent,
        patterns,
        base_score,
    }
}

/// Rules that apply to every industry.
const COMMON_RULES: &[IntentRule] = &[
    rule(
        "fraud_report",
        &[
            "fraud",
            "scam",
            "scammed",
            "unauthorized",
            "unauthorised",
            "didn't make this",
            "stolen card",
        ],
        0.85,
    ),
    rule(
        "identity_theft",
        &[
            "identity theft",
            "stole my identity",
            "stolen identity",
            "someone is using my name",
            "opened an account in my name",
        ],
        0.9,
    ),
    rule(
        "security_concern",
        &[
            "hacked",
            "phishing",
            "suspicious login",
            "someone accessed",
            "security breach",
            "compromised",
        ],
        0.8,
    ),
    rule(
        "account_update",
        &[
            "change my address",
            "update my details",
            "change my number",
            "update my email",
        ],
        0.65,
    ),
    rule(
        "greeting",
        &["hello", "hi", "hey", "good morning", "good afternoon", "good evening"],
        0.5,
    ),
    rule("gratitude", &["thank you", "thanks", "appreciate it"], 0.5),
];

const MOBILE_RULES: &[IntentRule] = &[
    rule(
        "balance_check",
        &["balance", "airtime left", "how much credit", "remaining data"],
        0.7,
    ),
    rule(
        "data_bundle",
        &["data bundle", "bundle", "data plan", "buy data"],
        0.7,
    ),
    rule("top_up", &["top up", "recharge", "reload", "buy airtime"], 0.7),
    rule(
        "sim_swap",
        &["sim swap", "replace my sim", "lost my sim", "new sim"],
        0.75,
    ),
    rule(
        "network_issue",
        &["no signal", "network", "coverage", "dropped call", "no service"],
        0.65,
    ),
];

const BANKING_RULES: &[IntentRule] = &[
    rule(
        "balance_check",
        &["balance", "how much money", "account balance"],
        0.7,
    ),
    rule(
        "transfer",
        &["transfer", "send money", "wire", "beneficiary"],
        0.7,
    ),
    rule(
        "card_issue",
        &[
            "card blocked",
            "card declined",
            "lost card",
            "lost my card",
            "block my card",
            "atm",
        ],
        0.7,
    ),
    rule(
        "statement_request",
        &["statement", "transaction history"],
        0.7,
    ),
    rule("loan_inquiry", &["loan", "overdraft", "mortgage"], 0.65),
];

const MICROFINANCE_RULES: &[IntentRule] = &[
    rule(
        "loan_application",
        &["apply for a loan", "loan application", "borrow", "new loan"],
        0.7,
    ),
    rule(
        "repayment",
        &["repay", "repayment", "installment", "instalment", "due date", "pay back"],
        0.7,
    ),
    rule(
        "loan_status",
        &["loan status", "disbursed", "disbursement", "approved"],
        0.7,
    ),
    rule("savings", &["savings", "group savings", "deposit"], 0.65),
    rule("loan_inquiry", &["loan", "interest rate"], 0.6),
];

const INSURANCE_RULES: &[IntentRule] = &[
    rule(
        "file_claim",
        &["file a claim", "make a claim", "submit a claim", "accident"],
        0.75,
    ),
    rule("claim_status", &["claim status", "my claim", "claim"], 0.7),
    rule(
        "premium_payment",
        &["pay my premium", "premium payment", "premium due"],
        0.7,
    ),
    rule(
        "policy_inquiry",
        &["policy", "coverage", "cover", "premium", "beneficiary"],
        0.65,
    ),
];

const TELEVISION_RULES: &[IntentRule] = &[
    rule(
        "subscription_renewal",
        &["renew", "subscription", "reconnect", "expired"],
        0.7,
    ),
    rule(
        "package_change",
        &["upgrade", "downgrade", "change package", "package"],
        0.65,
    ),
    rule(
        "decoder_issue",
        &["decoder", "no signal", "error code", "e16", "e48", "black screen"],
        0.7,
    ),
    rule("billing_inquiry", &["bill", "charged", "invoice"], 0.65),
];

/// Returns the industry-specific rule table.
pub fn industry_rules(industry: Industry) -> &'static [IntentRule] {
    match industry {
        Industry::Mobile => MOBILE_RULES,
        Industry::Banking => BANKING_RULES,
        Industry::Microfinance => MICROFINANCE_RULES,
        Industry::Insurance => INSURANCE_RULES,
        Industry::Television => TELEVISION_RULES,
    }
}

/// A rule that matched, with the evidence used for ranking.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    intent: &'static str,
    score: f32,
    longest_match: usize,
}

/// Keyword classifier over the built-in rule tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classifies `text` for `industry`.
    ///
    /// The highest score wins; ties go to the rule whose longest matched
    /// pattern is longer, then to table order (industry rules first).
    pub fn classify(&self, text: &str, industry: Industry) -> IntentResult {
        let normalized = normalize(text);
        if normalized.trim().is_empty() {
            return IntentResult::general_inquiry();
        }

        let mut best: Option<Candidate> = None;
        for rule in industry_rules(industry).iter().chain(COMMON_RULES) {
            let Some(candidate) = score_rule(rule, &normalized) else {
                continue;
            };
            let better = match &best {
                None => true,
                Some(current) => {
                    candidate.score > current.score
                        || (candidate.score == current.score
                            && candidate.longest_match > current.longest_match)
                }
            };
            if better {
                best = Some(candidate);
            }
        }

        match best {
            Some(c) => IntentResult::new(c.intent, c.score),
            None => IntentResult::general_inquiry(),
        }
    }
}

#[async_trait]
impl IntentClassifier for RuleClassifier {
    async fn detect_intent(&self, text: &str, industry: Industry) -> IntentResult {
        self.classify(text, industry)
    }
}

fn score_rule(rule: &IntentRule, normalized: &str) -> Option<Candidate> {
    let mut matches = 0usize;
    let mut longest_match = 0usize;
    for pattern in rule.patterns {
        if contains_phrase(normalized, pattern) {
            matches += 1;
            longest_match = longest_match.max(pattern.chars().count());
        }
    }
    if matches == 0 {
        return None;
    }
    let score =
        (rule.base_score + EXTRA_MATCH_BONUS * (matches - 1) as f32).min(MAX_RULE_CONFIDENCE);
    Some(Candidate {
        intent: rule.intent,
        score,
        longest_match,
    })
}

/// Lowercases and collapses everything except letters, digits and apostrophes
/// to single spaces, padded at both ends so phrase checks respect word edges.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    let mut last_space = true;
    for c in text.chars().flat_map(char::to_lowercase) {
        let c = if c == '\u{2019}' { '\'' } else { c };
        if c.is_alphanumeric() || c == '\'' {
            out.push(c);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if !last_space {
        out.push(' ');
    }
    out
}

fn contains_phrase(normalized: &str, pattern: &str) -> bool {
    normalized.contains(&format!(" {pattern} "))
}
