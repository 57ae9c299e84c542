// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WhatsApp Cloud (Graph) API.

use std::time::Duration;

use serde::Serialize;
use switchboard_core::SwitchboardError;
use switchboard_core::types::{MessageId, WhatsAppCredentials};
use tracing::debug;

use crate::types::{GraphErrorResponse, MarkReadRequest, SendResponse, SendTextRequest};

/// Calls the Graph API with a tenant's access token.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    client: reqwest::Client,
    api_base: String,
}

fn channel_err(message: String, e: reqwest::Error) -> SwitchboardError {
    SwitchboardError::Channel {
        message,
        source: Some(Box::new(e)),
    }
}

impl WhatsAppClient {
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

    async fn post_messages<T: Serialize + ?Sized>(
        &self,
        credentials: &WhatsAppCredentials,
        body: &T,
    ) -> Result<reqwest::Response, SwitchboardError> {
        let url = format!("{}/{}/messages", self.api_base, credentials.phone_number_id);
        let response = self
            .client
            .post(url)
            .bearer_auth(&credentials.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| channel_err(format!("WhatsApp request failed: {e}"), e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<GraphErrorResponse>(&text) {
            Ok(err) => format!(
                "WhatsApp API error {} ({}): {}",
                err.error.code.unwrap_or_default(),
                err.error.kind.as_deref().unwrap_or("unknown"),
                err.error.message
            ),
            Err(_) => format!("WhatsApp API returned {status}: {text}"),
        };
        Err(SwitchboardError::Channel {
            message,
            source: None,
        })
    }

    /// Sends a text message from the tenant's business number.
    pub async fn send_text(
        &self,
        credentials: &WhatsAppCredentials,
        to: &str,
        body: &str,
    ) -> Result<MessageId, SwitchboardError> {
        let response = self
            .post_messages(credentials, &SendTextRequest::new(to, body))
            .await?;
        let sent: SendResponse = response
            .json()
            .await
            .map_err(|e| channel_err(format!("failed to parse WhatsApp response: {e}"), e))?;
        let id = sent
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| SwitchboardError::Channel {
                message: "WhatsApp response carried no message id".into(),
                source: None,
            })?;
        debug!(message_id = %id, "whatsapp message accepted");
        Ok(MessageId(id))
    }

    /// Marks an inbound message as read.
    pub async fn mark_read(
        &self,
        credentials: &WhatsAppCredentials,
        message_id: &str,
    ) -> Result<(), SwitchboardError> {
        self.post_messages(credentials, &MarkReadRequest::new(message_id))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> WhatsAppCredentials {
        WhatsAppCredentials {
            phone_number_id: "1001".into(),
            access_token: "wa-token".into(),
        }
    }

    #[tokio::test]
    async fn send_text_posts_bearer_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1001/messages"))
            .and(header("authorization", "Bearer wa-token"))
            .and(body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "recipient_type": "individual",
                "to": "254700000001",
                "type": "text",
                "text": {"preview_url": false, "body": "hello"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "contacts": [{"input": "254700000001", "wa_id": "254700000001"}],
                "messages": [{"id": "wamid.out"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let id = client
            .send_text(&credentials(), "254700000001", "hello")
            .await
            .unwrap();
        assert_eq!(id.0, "wamid.out");
    }

    #[tokio::test]
    async fn mark_read_posts_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1001/messages"))
            .and(body_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "status": "read",
                "message_id": "wamid.in"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        client.mark_read(&credentials(), "wamid.in").await.unwrap();
    }

    #[tokio::test]
    async fn graph_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Invalid OAuth access token.", "type": "OAuthException", "code": 190}
            })))
            .mount(&server)
            .await;

        let client = WhatsAppClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let err = client.send_text(&credentials(), "1", "x").await.unwrap_err();
        assert!(err.to_string().contains("190 (OAuthException)"), "got {err}");
    }
}
