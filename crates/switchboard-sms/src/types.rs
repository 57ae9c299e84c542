// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio wire types.

use std::collections::BTreeMap;

use serde::Deserialize;
use switchboard_core::SwitchboardError;

/// The fields of an inbound SMS webhook the adapter acts on.
///
/// Twilio posts many more parameters; all of them are kept in the raw
/// parameter map for signature validation.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundSms {
    /// Sender number.
    pub from: String,
    /// Message text.
    pub body: String,
    /// Receiving number, identifies the tenant.
    pub to: Option<String>,
    pub message_sid: Option<String>,
}

impl InboundSms {
    /// Extracts the known fields from form parameters.
    pub fn from_params(params: &BTreeMap<String, String>) -> Result<Self, SwitchboardError> {
        let from = required(params, "From")?;
        let body = required(params, "Body")?;
        Ok(Self {
            from,
            body,
            to: optional(params, "To"),
            message_sid: optional(params, "MessageSid"),
        })
    }
}

fn required(params: &BTreeMap<String, String>, key: &str) -> Result<String, SwitchboardError> {
    optional(params, key)
        .ok_or_else(|| SwitchboardError::Validation(format!("SMS webhook is missing `{key}`")))
}

fn optional(params: &BTreeMap<String, String>, key: &str) -> Option<String> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Response of the Messages create endpoint.
#[derive(Debug, Deserialize)]
pub struct MessageResource {
    pub sid: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body returned by the Twilio REST API.
#[derive(Debug, Deserialize)]
pub struct TwilioErrorResponse {
    #[serde(default)]
    pub code: Option<u32>,
    pub message: String,
}
