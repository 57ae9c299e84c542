// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Twilio Messages API.

use std::time::Duration;

use switchboard_core::SwitchboardError;
use switchboard_core::types::{MessageId, SmsCredentials};
use tracing::debug;

use crate::types::{MessageResource, TwilioErrorResponse};

/// Sends SMS through a Twilio-compatible REST API.
///
/// The client holds no credentials; every call is made with the credentials
/// of the tenant that owns the conversation.
#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: reqwest::Client,
    api_base: String,
}

fn channel_err(message: String, e: reqwest::Error) -> SwitchboardError {
    SwitchboardError::Channel {
        message,
        source: Some(Box::new(e)),
    }
}

impl TwilioClient {
    /// Creates a client whose every request is bounded by `timeout`.
    pub fn new(api_base: &str, timeout: Duration) -> Result<Self, SwitchboardError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| channel_err(format!("failed to build HTTP client: {e}"), e))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self, account_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{account_sid}/Messages.json",
            self.api_base
        )
    }

    /// Sends one SMS from the tenant's number.
    pub async fn send_message(
        &self,
        credentials: &SmsCredentials,
        to: &str,
        body: &str,
    ) -> Result<MessageId, SwitchboardError> {
        let response = self
            .client
            .post(self.messages_url(&credentials.account_sid))
            .basic_auth(&credentials.account_sid, Some(&credentials.auth_token))
            .form(&[
                ("To", to),
                ("From", credentials.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| channel_err(format!("SMS request failed: {e}"), e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<TwilioErrorResponse>(&text) {
                Ok(err) => match err.code {
                    Some(code) => format!("Twilio error {code}: {}", err.message),
                    None => format!("Twilio error: {}", err.message),
                },
                Err(_) => format!("Twilio returned {status}: {text}"),
            };
            return Err(SwitchboardError::Channel {
                message,
                source: None,
            });
        }

        let resource: MessageResource = response
            .json()
            .await
            .map_err(|e| channel_err(format!("failed to parse Twilio response: {e}"), e))?;
        debug!(sid = %resource.sid, status = ?resource.status, "sms accepted");
        Ok(MessageId(resource.sid))
    }
}
