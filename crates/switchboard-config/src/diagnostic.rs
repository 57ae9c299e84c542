// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics rendered through miette.
//!
//! Figment errors are translated into [`ConfigError`] values that carry the
//! offending key, a "did you mean" suggestion (Jaro-Winkler via `strsim`) and,
//! when the TOML text is available, a labelled source span.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a valid key must beat to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration problem, reported before the server starts.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no section declares.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(switchboard::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        /// Comma-separated keys accepted by the enclosing section.
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value outside a closed set, e.g. an unsupported tenant industry.
    #[error("invalid value `{value}` for `{key}`")]
    #[diagnostic(
        code(switchboard::config::invalid_value),
        help("expected one of: {expected}")
    )]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
        #[label("unsupported value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong TOML type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(switchboard::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A required key is absent, e.g. `company_id` in a `[[tenants]]` entry.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(switchboard::config::missing_key),
        help("add `{key} = <value>` to switchboard.toml")
    )]
    MissingKey { key: String },

    /// A value that parses but breaks a startup rule.
    #[error("validation error: {message}")]
    #[diagnostic(code(switchboard::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(switchboard::config::other))]
    Other(String),
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Dotted key path for an error, e.g. `tenants.0.industry`.
fn dotted(path: &[String], leaf: Option<&str>) -> String {
    path.iter()
        .map(String::as_str)
        .chain(leaf)
        .collect::<Vec<_>>()
        .join(".")
}

/// Translates every error contained in a `figment::Error`.
///
/// `toml_sources` holds `(name, content)` pairs used to attach source spans.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| {
            let path = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let (span, src) = locate(&error, &path, field, toml_sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion: suggest_key(field, expected),
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::UnknownVariant(value, expected) => {
                    let (section, leaf) = split_leaf(&path);
                    let (span, src) = locate(&error, section, leaf, toml_sources);
                    ConfigError::InvalidValue {
                        key: dotted(&path, None),
                        value: value.clone(),
                        expected: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: dotted(&path, Some(field.as_ref())),
                },
                Kind::InvalidType(actual, expected) => {
                    let (section, leaf) = split_leaf(&path);
                    let (span, src) = locate(&error, section, leaf, toml_sources);
                    ConfigError::InvalidType {
                        key: dotted(&path, None),
                        detail: format!("found {actual}, expected {expected}"),
                        expected: expected.clone(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

/// Splits `["gateway", "port"]` into `(["gateway"], "port")`.
fn split_leaf(path: &[String]) -> (&[String], &str) {
    match path.split_last() {
        Some((leaf, section)) => (section, leaf.as_str()),
        None => (path, ""),
    }
}

/// Finds the TOML text an error came from and the span of `key` inside it.
///
/// Errors from a file source match by path. Errors without one (inline
/// strings, env overrides) fall back to the only source when there is one.
fn locate(
    error: &figment::error::Error,
    section: &[String],
    key: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    if key.is_empty() {
        return (None, None);
    }

    let file = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    let source = match file {
        Some(file) => toml_sources.iter().find(|(name, _)| *name == file),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    let Some((name, content)) = source else {
        return (None, None);
    };
    match find_key_offset(content, section, key) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), key.len())),
            Some(NamedSource::new(name, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `key` inside the table named by `section`.
///
/// Scans line by line, tracking the current `[table]` or `[[array]]` header.
/// Numeric path segments (array indices) are ignored, so `["tenants", "0"]`
/// matches any `[[tenants]]` block. Keys written as `section.key = ...` at the
/// top level are matched too.
pub fn find_key_offset(content: &str, section: &[String], key: &str) -> Option<usize> {
    let wanted: Vec<&str> = section
        .iter()
        .map(String::as_str)
        .filter(|segment| segment.parse::<usize>().is_err())
        .collect();
    let wanted_table = wanted.join(".");
    let dotted_key = if wanted_table.is_empty() {
        key.to_string()
    } else {
        format!("{wanted_table}.{key}")
    };

    let mut current_table = String::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim();

        if let Some(header) = trimmed.strip_prefix('[') {
            current_table = header
                .trim_start_matches('[')
                .split(']')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
        } else if current_table == wanted_table && starts_with_key(trimmed, key) {
            return Some(offset + indent);
        } else if current_table.is_empty() && starts_with_key(trimmed, &dotted_key) {
            return Some(offset + indent + dotted_key.len() - key.len());
        }

        offset += line.len();
    }

    None
}

fn starts_with_key(line: &str, key: &str) -> bool {
    line.strip_prefix(key)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

/// Best Jaro-Winkler match for `unknown` among `valid_keys`, if close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Prints every error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        let diagnostic: &dyn Diagnostic = error;
        if handler.render_report(&mut buf, diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
    eprintln!(
        "switchboard: {} configuration error{}",
        errors.len(),
        if errors.len() == 1 { "" } else { "s" }
    );
}
