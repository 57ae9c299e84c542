// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! axum routes for the WhatsApp webhook.
//!
//! - `GET /webhooks/whatsapp`: subscription handshake, echoes `hub.challenge`
//! - `POST /webhooks/whatsapp`: message notifications, always answered 200

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use switchboard_agent::Pipeline;
use switchboard_config::model::WhatsAppConfig;
use switchboard_core::types::{Channel, InboundMessage};
use switchboard_core::{SwitchboardError, TenantDirectory};
use tracing::{debug, error, info, warn};

use crate::WhatsAppChannel;
use crate::client::WhatsAppClient;
use crate::signature::verify_signature;
use crate::types::{InboundText, WebhookEnvelope, text_messages};

pub const WHATSAPP_WEBHOOK_PATH: &str = "/webhooks/whatsapp";

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Webhook secrets from the `[whatsapp]` config section.
#[derive(Clone, Default)]
pub struct WhatsAppSettings {
    pub verify_token: Option<String>,
    /// `None` disables signature checks.
    pub app_secret: Option<String>,
}

impl WhatsAppSettings {
    pub fn from_config(config: &WhatsAppConfig) -> Self {
        Self {
            verify_token: config.verify_token.clone(),
            app_secret: config.app_secret.clone(),
        }
    }
}

/// Shared state for the WhatsApp routes.
#[derive(Clone)]
pub struct WhatsAppState {
    pub pipeline: Arc<Pipeline>,
    pub directory: Arc<dyn TenantDirectory>,
    pub client: WhatsAppClient,
    pub settings: WhatsAppSettings,
}

/// Builds the WhatsApp webhook router.
pub fn whatsapp_router(state: WhatsAppState) -> Router {
    Router::new()
        .route(
            WHATSAPP_WEBHOOK_PATH,
            get(verify_subscription).post(receive_notification),
        )
        .with_state(state)
}

/// GET /webhooks/whatsapp
async fn verify_subscription(
    State(state): State<WhatsAppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mode = params.get("hub.mode").map(String::as_str);
    let token = params.get("hub.verify_token").map(String::as_str);
    let challenge = params
        .get("hub.challenge")
        .filter(|c| !c.is_empty());

    match (mode, token, challenge, state.settings.verify_token.as_deref()) {
        (Some("subscribe"), Some(token), Some(challenge), Some(expected)) if token == expected => {
            info!("whatsapp webhook subscription verified");
            (StatusCode::OK, challenge.clone()).into_response()
        }
        _ => {
            warn!("whatsapp webhook verification failed");
            (StatusCode::FORBIDDEN, "verification failed").into_response()
        }
    }
}

/// POST /webhooks/whatsapp
async fn receive_notification(
    State(state): State<WhatsAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if let Some(secret) = &state.settings.app_secret {
        let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
        if !verify_signature(secret, signature, &body) {
            warn!("whatsapp webhook signature mismatch, dropping payload");
            return StatusCode::OK;
        }
    }

    let envelope: WebhookEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "malformed whatsapp payload, dropping");
            return StatusCode::OK;
        }
    };

    let messages = match text_messages(&envelope) {
        Ok(messages) => messages,
        Err(reason) => {
            debug!(%reason, "whatsapp webhook has nothing to process");
            return StatusCode::OK;
        }
    };

    for message in messages {
        let message_id = message.message_id.clone();
        if let Err(e) = handle_text(&state, message).await {
            error!(message_id = %message_id, error = %e, "failed to process whatsapp message");
        }
    }
    StatusCode::OK
}

async fn handle_text(state: &WhatsAppState, message: InboundText) -> Result<(), SwitchboardError> {
    let tenant = state
        .directory
        .by_whatsapp_phone_number_id(&message.phone_number_id)?;
    let Some(credentials) = tenant.whatsapp.clone() else {
        return Err(SwitchboardError::NotFound {
            entity: "whatsapp credentials",
            id: tenant.company_id,
        });
    };

    if let Err(e) = state.client.mark_read(&credentials, &message.message_id).await {
        warn!(message_id = %message.message_id, error = %e, "failed to mark message read");
    }

    let customer_id = state
        .pipeline
        .store()
        .storage()
        .resolve_customer(Some(&tenant.company_id), &message.from)
        .await?;

    let channel = WhatsAppChannel::new(
        state.client.clone(),
        tenant.company_id.clone(),
        credentials,
    );
    let inbound = InboundMessage {
        channel: Channel::Whatsapp,
        customer_id,
        reply_to: message.from,
        industry: tenant.industry,
        company_id: Some(tenant.company_id),
        conversation_id: None,
        text: message.body,
        external_id: Some(message.message_id),
    };

    let outcome = state.pipeline.handle(inbound, &channel).await?;
    info!(
        conversation_id = %outcome.conversation_id,
        outcome = ?outcome.kind,
        responded = outcome.should_respond(),
        "whatsapp message handled"
    );
    Ok(())
}
