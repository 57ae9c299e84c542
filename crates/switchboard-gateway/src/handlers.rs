// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for health, metrics and the dashboard API.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use switchboard_core::{HealthStatus, PluginAdapter, SwitchboardError};
use switchboard_core::types::{Conversation, ConversationStatus, EscalationEntry, Message};

use crate::server::GatewayState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps a [`SwitchboardError`] onto its HTTP status with a JSON body.
#[derive(Debug)]
pub struct ApiError(pub SwitchboardError);

impl From<SwitchboardError> for ApiError {
    fn from(err: SwitchboardError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, "request rejected");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health
///
/// Liveness plus a storage probe; a failing store reports 503.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let storage = state.pipeline.store().storage().health_check().await;
    let (code, status) = match storage {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "ok".to_string()),
        Ok(HealthStatus::Degraded(reason)) => {
            (StatusCode::OK, format!("degraded: {reason}"))
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {reason}"))
        }
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, format!("unhealthy: {e}")),
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.health.start_time.elapsed().as_secs(),
        }),
    )
        .into_response()
}

/// GET /metrics
///
/// Prometheus text exposition. 404 when metrics are disabled.
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    let Some(render) = &state.health.prometheus_render else {
        return (StatusCode::NOT_FOUND, "metrics disabled").into_response();
    };

    match open_conversation_count(&state).await {
        Ok(count) => switchboard_prometheus::set_open_conversations(count as f64),
        Err(e) => tracing::warn!(error = %e, "failed to count open conversations"),
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        render(),
    )
        .into_response()
}

async fn open_conversation_count(state: &GatewayState) -> Result<usize, SwitchboardError> {
    let store = state.pipeline.store();
    let active = store.list(Some(ConversationStatus::Active)).await?.len();
    let escalated = store.list(Some(ConversationStatus::Escalated)).await?.len();
    Ok(active + escalated)
}

/// Query for GET /conversations.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// Response body for GET /conversations.
#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<Conversation>,
}

/// GET /conversations?status=
pub async fn list_conversations(
    State(state): State<GatewayState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ConversationListResponse>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            ConversationStatus::from_str(s).map_err(|_| {
                SwitchboardError::Validation(format!(
                    "unknown status `{s}` (expected active, escalated or resolved)"
                ))
            })
        })
        .transpose()?;

    let conversations = state.pipeline.store().list(status).await?;
    Ok(Json(ConversationListResponse { conversations }))
}

/// GET /conversations/{id}
///
/// The conversation with its ordered message log.
pub async fn get_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(state.pipeline.store().get(&id).await?))
}

/// POST /conversations/{id}/resolve
pub async fn resolve_conversation(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(state.pipeline.store().resolve(&id).await?))
}

/// Request body for POST /conversations/{id}/assign.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub agent: String,
}

/// POST /conversations/{id}/assign
pub async fn assign_agent(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<AssignRequest>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(
        state.pipeline.store().assign_agent(&id, &body.agent).await?,
    ))
}

/// Request body for POST /conversations/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct AgentMessageRequest {
    pub agent: String,
    pub content: String,
}

/// POST /conversations/{id}/messages
///
/// Records a human agent's message in the conversation log.
pub async fn post_agent_message(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<AgentMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message = state
        .pipeline
        .store()
        .add_agent_message(&id, &body.agent, &body.content)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /conversations/{id}/escalations
pub async fn list_escalations(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<EscalationEntry>>, ApiError> {
    Ok(Json(state.pipeline.store().escalations(&id).await?))
}

/// POST /escalations/next
///
/// Claims the next pending hand-off for a dispatcher. 204 when the queue is empty.
pub async fn next_escalation(State(state): State<GatewayState>) -> Result<Response, ApiError> {
    Ok(match state.pipeline.store().next_escalation().await? {
        Some(entry) => Json(entry).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// POST /escalations/{id}/ack
pub async fn ack_escalation(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.pipeline.store().ack_escalation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /escalations/{id}/fail
///
/// Returns the entry to the queue until its attempts run out.
pub async fn fail_escalation(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.pipeline.store().fail_escalation(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
