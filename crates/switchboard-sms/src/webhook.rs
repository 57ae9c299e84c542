// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! axum routes for the Twilio SMS webhook.
//!
//! - `POST /webhooks/sms`: form-encoded inbound message, answered with 200 text
//! - `GET /webhooks/sms`: liveness text

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use switchboard_agent::Pipeline;
use switchboard_config::model::SmsConfig;
use switchboard_core::types::{Channel, InboundMessage};
use switchboard_core::{SwitchboardError, TenantDirectory};
use tracing::{info, warn};

use crate::SmsChannel;
use crate::client::TwilioClient;
use crate::signature::verify_signature;
use crate::types::InboundSms;

pub const SMS_WEBHOOK_PATH: &str = "/webhooks/sms";

const SIGNATURE_HEADER: &str = "x-twilio-signature";

/// SMS behavior taken from the `[sms]` config section.
#[derive(Debug, Clone)]
pub struct SmsSettings {
    pub max_length: usize,
    pub continuation_marker: String,
    pub validate_signatures: bool,
    /// Public URL Twilio signs requests with.
    pub webhook_url: Option<String>,
}

impl Default for SmsSettings {
    fn default() -> Self {
        Self::from_config(&SmsConfig::default())
    }
}

impl SmsSettings {
    pub fn from_config(config: &SmsConfig) -> Self {
        Self {
            max_length: config.max_length,
            continuation_marker: config.continuation_marker.clone(),
            validate_signatures: config.validate_signatures,
            webhook_url: config.webhook_url.clone(),
        }
    }
}

/// Shared state for the SMS routes.
#[derive(Clone)]
pub struct SmsState {
    pub pipeline: Arc<Pipeline>,
    pub directory: Arc<dyn TenantDirectory>,
    pub client: TwilioClient,
    pub settings: SmsSettings,
}

/// Builds the SMS webhook router.
pub fn sms_router(state: SmsState) -> Router {
    Router::new()
        .route(SMS_WEBHOOK_PATH, post(receive_sms).get(sms_liveness))
        .with_state(state)
}

/// Why a webhook was not processed.
#[derive(Debug)]
enum WebhookError {
    BadSignature,
    Pipeline(SwitchboardError),
}

impl From<SwitchboardError> for WebhookError {
    fn from(e: SwitchboardError) -> Self {
        Self::Pipeline(e)
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            WebhookError::BadSignature => {
                (StatusCode::FORBIDDEN, "invalid webhook signature".to_string())
            }
            WebhookError::Pipeline(e) => (
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.to_string(),
            ),
        };
        (status, Json(serde_json::json!({ "error": error }))).into_response()
    }
}

/// GET /webhooks/sms
async fn sms_liveness() -> &'static str {
    "SMS webhook is live"
}

/// POST /webhooks/sms
async fn receive_sms(
    State(state): State<SmsState>,
    headers: HeaderMap,
    Form(params): Form<BTreeMap<String, String>>,
) -> Response {
    match handle_sms(&state, &headers, &params).await {
        Ok(()) => (StatusCode::OK, "Message received").into_response(),
        Err(e) => {
            if let WebhookError::Pipeline(err) = &e {
                warn!(error = %err, "sms webhook rejected");
            }
            e.into_response()
        }
    }
}

async fn handle_sms(
    state: &SmsState,
    headers: &HeaderMap,
    params: &BTreeMap<String, String>,
) -> Result<(), WebhookError> {
    let sms = InboundSms::from_params(params)?;
    let tenant = state.directory.by_sms_number(sms.to.as_deref())?;
    let Some(credentials) = tenant.sms.clone() else {
        return Err(SwitchboardError::NotFound {
            entity: "sms credentials",
            id: tenant.company_id,
        }
        .into());
    };

    if state.settings.validate_signatures {
        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        let valid = match &state.settings.webhook_url {
            Some(url) => verify_signature(&credentials.auth_token, url, params, signature),
            None => false,
        };
        if !valid {
            warn!(company_id = %tenant.company_id, "sms webhook signature mismatch");
            return Err(WebhookError::BadSignature);
        }
    }

    let customer_id = state
        .pipeline
        .store()
        .storage()
        .resolve_customer(Some(&tenant.company_id), &sms.from)
        .await?;

    let channel = SmsChannel::new(
        state.client.clone(),
        tenant.company_id.clone(),
        credentials,
        &state.settings,
    );
    let inbound = InboundMessage {
        channel: Channel::Sms,
        customer_id,
        reply_to: sms.from,
        industry: tenant.industry,
        company_id: Some(tenant.company_id),
        conversation_id: None,
        text: sms.body,
        external_id: sms.message_sid,
    };

    let outcome = state.pipeline.handle(inbound, &channel).await?;
    info!(
        conversation_id = %outcome.conversation_id,
        outcome = ?outcome.kind,
        replies = outcome.replies.len(),
        "sms handled"
    );
    Ok(())
}
