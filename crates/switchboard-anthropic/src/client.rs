// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thin reqwest wrapper around `POST /v1/messages`.
//!
//! One retry on 429/5xx overload responses. Turn deadlines live in the
//! generator, not here.

use std::pin::Pin;
use std::time::Duration;

use futures::Stream;
use reqwest::header::{HeaderMap, HeaderValue};
use switchboard_core::SwitchboardError;
use tracing::{debug, warn};

use crate::sse::{self, StreamEvent};
use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse};

/// Path of the Messages endpoint relative to the base URL.
const MESSAGES_PATH: &str = "/v1/messages";

/// Delay before the single retry of a transient failure.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Authenticated Messages API client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
}

fn generation_err(message: String, e: reqwest::Error) -> SwitchboardError {
    SwitchboardError::Generation {
        message,
        source: Some(Box::new(e)),
    }
}

impl AnthropicClient {
    /// Creates a client with authentication headers set.
    pub fn new(api_key: &str, api_version: &str, base_url: &str) -> Result<Self, SwitchboardError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| SwitchboardError::Config(format!("invalid API key header value: {e}")))?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(api_version).map_err(|e| {
                SwitchboardError::Config(format!("invalid API version header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| generation_err(format!("failed to build HTTP client: {e}"), e))?;

        Ok(Self {
            client,
            endpoint: format!("{}{MESSAGES_PATH}", base_url.trim_end_matches('/')),
            max_retries: 1,
        })
    }

    /// Sends the request, retrying once on 429/5xx-overload responses.
    async fn send(&self, request: &MessageRequest) -> Result<reqwest::Response, SwitchboardError> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&self.endpoint)
                .json(request)
                .send()
                .await
                .map_err(|e| generation_err(format!("HTTP request failed: {e}"), e))?;

            let status = response.status();
            debug!(status = %status, attempt, stream = request.stream, "anthropic response received");

            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, "transient error from anthropic, will retry");
                attempt += 1;
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }

            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!("Anthropic API error ({})", api_err.error),
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(SwitchboardError::generation(message));
        }
    }

    /// Sends a non-streaming request and returns the full response.
    pub async fn complete_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, SwitchboardError> {
        let mut req = request.clone();
        req.stream = false;

        let response = self.send(&req).await?;
        response
            .json::<MessageResponse>()
            .await
            .map_err(|e| generation_err(format!("failed to parse API response: {e}"), e))
    }

    /// Sends a streaming request and returns the parsed event stream.
    pub async fn stream_message(
        &self,
        request: &MessageRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamEvent, SwitchboardError>> + Send>>, SwitchboardError>
    {
        let mut req = request.clone();
        req.stream = true;

        let response = self.send(&req).await?;
        Ok(sse::parse_sse_stream(response))
    }
}

/// Rate limiting and overload statuses.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}
