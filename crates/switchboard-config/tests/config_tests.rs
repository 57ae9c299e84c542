// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Switchboard configuration system.

use switchboard_config::diagnostic::ConfigError;
use switchboard_config::model::SwitchboardConfig;
use switchboard_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use switchboard_core::types::Industry;

/// A full configuration with tenants deserializes successfully.
#[test]
fn valid_toml_deserializes_into_config() {
    let toml = r#"
[agent]
name = "Acme Support"
log_level = "debug"

[gateway]
host = "0.0.0.0"
port = 8080

[storage]
database_path = "/tmp/switchboard-test.db"
wal_mode = false

[anthropic]
api_key = "sk-ant-123"
model = "claude-haiku-4-5"

[escalation]
confidence_threshold = 0.5
triggers = ["agent", "human"]

[sms]
max_length = 160

[whatsapp]
verify_token = "verify-me"

[guidelines]
mobile = "Custom mobile guideline."

[[tenants]]
company_id = "acme"
industry = "mobile"

[tenants.sms]
account_sid = "AC123"
auth_token = "tok"
from_number = "+15550001"

[tenants.whatsapp]
phone_number_id = "1001"
access_token = "wa-tok"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.agent.name, "Acme Support");
    assert_eq!(config.agent.log_level, "debug");
    assert_eq!(config.gateway.port, 8080);
    assert!(!config.storage.wal_mode);
    assert_eq!(config.anthropic.api_key.as_deref(), Some("sk-ant-123"));
    assert!((config.escalation.confidence_threshold - 0.5).abs() < f32::EPSILON);
    assert_eq!(config.escalation.triggers, vec!["agent", "human"]);
    assert_eq!(config.sms.max_length, 160);
    assert_eq!(config.whatsapp.verify_token.as_deref(), Some("verify-me"));
    assert_eq!(config.tenants.len(), 1);
    assert_eq!(config.tenants[0].industry, Industry::Mobile);
    assert_eq!(
        config.tenants[0].sms.as_ref().map(|s| s.from_number.as_str()),
        Some("+15550001")
    );
}

/// Overriding one guideline keeps the built-in entries for the other industries.
#[test]
fn guideline_override_merges_with_defaults() {
    let toml = r#"
[guidelines]
banking = "Only discuss savings accounts."
"#;
    let config = load_and_validate_str(toml).expect("should validate");
    assert_eq!(config.guidelines["banking"], "Only discuss savings accounts.");
    assert_eq!(config.guidelines.len(), 5);
    assert!(!config.guidelines["television"].is_empty());
}

/// An empty guideline for a supported industry is rejected at startup.
#[test]
fn empty_guideline_override_is_rejected() {
    let toml = r#"
[guidelines]
insurance = ""
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject empty guideline");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("guidelines.insurance")))
    );
}

/// Missing sections fall back to defaults.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty config should deserialize");
    let defaults = SwitchboardConfig::default();
    assert_eq!(config.gateway.port, defaults.gateway.port);
    assert_eq!(config.generation.timeout_secs, 30);
    assert_eq!(config.prompt.budget_chars, 6000);
    assert_eq!(config.sms.continuation_marker, "...");
    assert!(config.prometheus.enabled);
}

/// Unknown key in a section is reported with a suggestion and the section's valid keys.
#[test]
fn unknown_key_suggests_correction() {
    let toml = r#"
[sms]
max_lenght = 100
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "max_lenght"
                && suggestion.as_deref() == Some("max_length")
                && valid_keys.contains("continuation_marker")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'max_lenght', got: {errors:?}"
    );
}

/// Unknown top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[telegram]
bot_token = "abc"
"#;
    let err = load_config_from_str(toml).expect_err("should reject unknown section");
    assert!(format!("{err}").contains("telegram"));
}

/// Unknown industry in a tenant is a type error, not a silent default.
#[test]
fn unknown_tenant_industry_is_rejected() {
    let toml = r#"
[[tenants]]
company_id = "acme"
industry = "retail"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Invalid type produces an InvalidType diagnostic naming the key.
#[test]
fn invalid_type_names_key() {
    let toml = r#"
[gateway]
port = "not-a-port"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    let message = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    assert!(message.contains("port"), "got: {message}");
}

/// Duplicate tenant credentials are reported together.
#[test]
fn duplicate_whatsapp_number_across_tenants_is_rejected() {
    let toml = r#"
[[tenants]]
company_id = "acme"
industry = "mobile"
whatsapp = { phone_number_id = "1001", access_token = "a" }

[[tenants]]
company_id = "globex"
industry = "banking"
whatsapp = { phone_number_id = "1001", access_token = "b" }
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject shared number");
    assert_eq!(errors.len(), 1, "got: {errors:?}");
    assert!(errors[0].to_string().contains("1001"));
}

/// ConfigError renders through miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "verify_tokn".to_string(),
        suggestion: Some("verify_token".to_string()),
        valid_keys: "verify_token, app_secret".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().map(|h| h.to_string()).unwrap_or_default();
    assert!(help.contains("did you mean `verify_token`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("verify_tokn"));
}

/// Loading from an explicit path validates too.
#[test]
fn load_and_validate_path_reads_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("switchboard.toml");
    std::fs::write(&path, "[gateway]\nport = 9090\n").expect("write config");
    let config = load_and_validate_path(&path).expect("should validate");
    assert_eq!(config.gateway.port, 9090);
}

/// Env overrides map section prefixes onto dotted keys.
#[test]
fn env_style_override_reaches_nested_key() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: SwitchboardConfig = Figment::new()
        .merge(Serialized::defaults(SwitchboardConfig::default()))
        .merge(Toml::string("[sms]\nmax_length = 200\n"))
        .merge(("sms.max_length", 120))
        .extract()
        .expect("should merge override");
    assert_eq!(config.sms.max_length, 120);
}
