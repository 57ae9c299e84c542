// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks the constraints serde cannot express: guideline completeness per
//! industry, value ranges, and credential ownership across tenants.

use std::collections::HashSet;
use std::str::FromStr;

use strum::IntoEnumIterator;
use switchboard_core::types::Industry;

use crate::diagnostic::ConfigError;
use crate::model::SwitchboardConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SwitchboardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    validate_guidelines(config, &mut errors);
    validate_ranges(config, &mut errors);
    validate_tenants(config, &mut errors);

    if config.storage.database_path.trim().is_empty() {
        errors.push(invalid("storage.database_path must not be empty"));
    }

    if config.gateway.host.trim().is_empty() {
        errors.push(invalid("gateway.host must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

/// Every industry needs a non-empty guideline, and no other keys are allowed.
fn validate_guidelines(config: &SwitchboardConfig, errors: &mut Vec<ConfigError>) {
    for industry in Industry::iter() {
        match config.guidelines.get(&industry.to_string()) {
            Some(text) if !text.trim().is_empty() => {}
            Some(_) => errors.push(invalid(format!(
                "guidelines.{industry} must not be empty"
            ))),
            None => errors.push(invalid(format!(
                "guidelines.{industry} is missing; every industry needs a guideline entry"
            ))),
        }
    }

    for key in config.guidelines.keys() {
        if Industry::from_str(key).is_err() {
            let valid: Vec<String> = Industry::iter().map(|i| i.to_string()).collect();
            errors.push(invalid(format!(
                "guidelines.{key} is not a supported industry (expected one of: {})",
                valid.join(", ")
            )));
        }
    }
}

fn validate_ranges(config: &SwitchboardConfig, errors: &mut Vec<ConfigError>) {
    let threshold = config.escalation.confidence_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        errors.push(invalid(format!(
            "escalation.confidence_threshold must be within [0, 1], got {threshold}"
        )));
    }

    if config.escalation.max_generation_failures == 0 {
        errors.push(invalid(
            "escalation.max_generation_failures must be at least 1",
        ));
    }

    for trigger in &config.escalation.triggers {
        if trigger.trim().is_empty() {
            errors.push(invalid("escalation.triggers must not contain empty phrases"));
        }
    }

    for (key, value) in [
        ("generation.timeout_secs", config.generation.timeout_secs),
        (
            "generation.chunk_timeout_secs",
            config.generation.chunk_timeout_secs,
        ),
        ("sms.timeout_secs", config.sms.timeout_secs),
        ("whatsapp.timeout_secs", config.whatsapp.timeout_secs),
    ] {
        if value == 0 {
            errors.push(invalid(format!("{key} must be positive")));
        }
    }

    if config.prompt.budget_chars == 0 {
        errors.push(invalid("prompt.budget_chars must be positive"));
    }

    if config.prompt.history_limit < 0 {
        errors.push(invalid(format!(
            "prompt.history_limit must be non-negative, got {}",
            config.prompt.history_limit
        )));
    }

    let marker_len = config.sms.continuation_marker.chars().count();
    if config.sms.max_length <= marker_len {
        errors.push(invalid(format!(
            "sms.max_length ({}) must be greater than the continuation marker length ({marker_len})",
            config.sms.max_length
        )));
    }

    if config.sms.validate_signatures && config.sms.webhook_url.is_none() {
        errors.push(invalid(
            "sms.webhook_url is required when sms.validate_signatures is enabled",
        ));
    }
}

/// Credentials belong to exactly one tenant.
fn validate_tenants(config: &SwitchboardConfig, errors: &mut Vec<ConfigError>) {
    let mut companies = HashSet::new();
    let mut sms_numbers = HashSet::new();
    let mut phone_number_ids = HashSet::new();

    for (i, tenant) in config.tenants.iter().enumerate() {
        if tenant.company_id.trim().is_empty() {
            errors.push(invalid(format!("tenants[{i}].company_id must not be empty")));
        } else if !companies.insert(tenant.company_id.as_str()) {
            errors.push(invalid(format!(
                "duplicate company_id `{}` in [[tenants]] array",
                tenant.company_id
            )));
        }

        if let Some(sms) = &tenant.sms {
            if sms.from_number.trim().is_empty() {
                errors.push(invalid(format!(
                    "tenants[{i}].sms.from_number must not be empty"
                )));
            } else if !sms_numbers.insert(sms.from_number.as_str()) {
                errors.push(invalid(format!(
                    "sms number `{}` is assigned to more than one tenant",
                    sms.from_number
                )));
            }
        }

        if let Some(wa) = &tenant.whatsapp {
            if wa.phone_number_id.trim().is_empty() {
                errors.push(invalid(format!(
                    "tenants[{i}].whatsapp.phone_number_id must not be empty"
                )));
            } else if !phone_number_ids.insert(wa.phone_number_id.as_str()) {
                errors.push(invalid(format!(
                    "whatsapp phone_number_id `{}` is assigned to more than one tenant",
                    wa.phone_number_id
                )));
            }
        }
    }

    if let Some(company) = &config.web.default_company_id
        && !config.tenants.is_empty()
        && !companies.contains(company.as_str())
    {
        errors.push(invalid(format!(
            "web.default_company_id `{company}` does not match any tenant"
        )));
    }
}
