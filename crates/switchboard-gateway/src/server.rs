// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use switchboard_agent::Pipeline;
use switchboard_core::SwitchboardError;
use switchboard_sms::{SmsState, sms_router};
use switchboard_whatsapp::{WhatsAppState, whatsapp_router};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::sse;

/// State for the unauthenticated health and metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Prometheus render function; `None` when metrics are disabled.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

impl HealthState {
    pub fn new(prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>) -> Self {
        Self {
            start_time: std::time::Instant::now(),
            prometheus_render,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<Pipeline>,
    /// Company attached to web conversations.
    pub default_company_id: Option<String>,
    pub health: HealthState,
}

/// Gateway listener address.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the full application router.
///
/// - `POST /chat`: web chat, streamed as SSE
/// - `GET /health`, `GET /metrics`
/// - `GET /conversations`, `GET /conversations/{id}` and the agent actions under it
/// - `POST /escalations/next`, `POST /escalations/{id}/ack|fail`
/// - the SMS and WhatsApp webhook routers, when their state is given
pub fn build_router(
    state: GatewayState,
    sms: Option<SmsState>,
    whatsapp: Option<WhatsAppState>,
) -> Router {
    let api = Router::new()
        .route("/chat", post(sse::post_chat))
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .route("/conversations", get(handlers::list_conversations))
        .route("/conversations/{id}", get(handlers::get_conversation))
        .route(
            "/conversations/{id}/resolve",
            post(handlers::resolve_conversation),
        )
        .route("/conversations/{id}/assign", post(handlers::assign_agent))
        .route("/conversations/{id}/messages", post(handlers::post_agent_message))
        .route(
            "/conversations/{id}/escalations",
            get(handlers::list_escalations),
        )
        .route("/escalations/next", post(handlers::next_escalation))
        .route("/escalations/{id}/ack", post(handlers::ack_escalation))
        .route("/escalations/{id}/fail", post(handlers::fail_escalation))
        .with_state(state);

    let mut app = api;
    if let Some(sms) = sms {
        app = app.merge(sms_router(sms));
    }
    if let Some(whatsapp) = whatsapp {
        app = app.merge(whatsapp_router(whatsapp));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds the listener and serves `app` until `shutdown` is cancelled.
///
/// Open SSE responses keep the server alive until their streams finish.
pub async fn start_server(
    config: &ServerConfig,
    app: Router,
    shutdown: CancellationToken,
) -> Result<(), SwitchboardError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SwitchboardError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| SwitchboardError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }

    #[tokio::test]
    async fn start_server_reports_bind_failure() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port,
        };
        let err = start_server(&config, Router::new(), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to bind"));
    }

    #[tokio::test]
    async fn start_server_stops_on_cancel() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        };
        let token = CancellationToken::new();
        token.cancel();
        start_server(&config, Router::new(), token).await.unwrap();
    }
}
