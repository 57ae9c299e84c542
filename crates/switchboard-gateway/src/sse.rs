// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events for `POST /chat`.
//!
//! Every frame is a single `data:` line:
//! ```text
//! data: {"content":"partial text","done":false}
//!
//! data: {"content":"","done":true}
//! ```
//!
//! Turns that produce no stream (hand-off, awaiting agent, apology) answer
//! with one `done: true` frame carrying the whole reply.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use switchboard_agent::{StreamItem, StreamingTurn};
use switchboard_core::SwitchboardError;
use switchboard_core::types::{Channel, InboundMessage, Industry};
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::WebChannel;
use crate::handlers::ApiError;
use crate::server::GatewayState;

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Continue this conversation; a new one is opened when absent.
    #[serde(default)]
    pub conversation_id: Option<String>,
    pub customer_id: String,
    pub message: String,
    pub industry: Industry,
}

/// One SSE frame payload.
#[derive(Debug, Serialize, PartialEq)]
pub struct ChatFrame<'a> {
    pub content: &'a str,
    pub done: bool,
}

fn frame(content: &str, done: bool) -> Result<Event, Infallible> {
    let payload = serde_json::to_string(&ChatFrame { content, done })
        .unwrap_or_else(|_| String::from(r#"{"content":"","done":true}"#));
    Ok(Event::default().data(payload))
}

/// POST /chat
pub async fn post_chat(
    State(state): State<GatewayState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(|e| SwitchboardError::Validation(e.body_text()))?;
    if body.customer_id.trim().is_empty() {
        return Err(SwitchboardError::Validation("customerId must not be empty".into()).into());
    }

    let inbound = InboundMessage {
        channel: Channel::Web,
        customer_id: body.customer_id.clone(),
        reply_to: body.customer_id,
        industry: body.industry,
        company_id: state.default_company_id.clone(),
        conversation_id: body.conversation_id,
        text: body.message,
        external_id: None,
    };

    let cancel = CancellationToken::new();
    let turn = state
        .pipeline
        .handle_streaming(inbound, &WebChannel, cancel.clone())
        .await?;

    Ok(match turn {
        StreamingTurn::Complete(outcome) => {
            tracing::debug!(
                conversation_id = %outcome.conversation_id,
                outcome = ?outcome.kind,
                "web turn completed without streaming"
            );
            let text = outcome.reply_text();
            Sse::new(stream::iter([frame(&text, true)])).into_response()
        }
        StreamingTurn::Streaming {
            conversation_id,
            items,
        } => {
            tracing::debug!(%conversation_id, "streaming web reply");
            Sse::new(chunk_events(items, cancel.drop_guard()))
                .keep_alive(KeepAlive::default())
                .into_response()
        }
    })
}

/// Forwards pipeline items as frames.
///
/// The guard lives inside the stream: when the client disconnects axum drops
/// the stream, the token is cancelled and generation stops.
fn chunk_events(
    items: mpsc::Receiver<StreamItem>,
    guard: DropGuard,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(Some((items, guard)), |state| async move {
        let (mut items, guard) = state?;
        match items.recv().await {
            Some(StreamItem::Chunk(text)) => Some((frame(&text, false), Some((items, guard)))),
            Some(StreamItem::Done) => {
                guard.disarm();
                Some((frame("", true), None))
            }
            // Producer ended without Done: close with a terminal frame.
            None => Some((frame("", true), None)),
        }
    })
    .fuse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_uses_camel_case() {
        let json = r#"{
            "conversationId": "c-1",
            "customerId": "cust-1",
            "message": "what's my balance",
            "industry": "mobile"
        }"#;
        let req: ChatRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.conversation_id.as_deref(), Some("c-1"));
        assert_eq!(req.customer_id, "cust-1");
        assert_eq!(req.industry, Industry::Mobile);
    }

    #[test]
    fn chat_request_conversation_id_is_optional() {
        let json = r#"{"customerId": "c", "message": "hi", "industry": "banking"}"#;
        let req: ChatRequest = serde_json::from_str(json).unwrap();
        assert!(req.conversation_id.is_none());
    }

    #[test]
    fn frame_payload_shape() {
        let json = serde_json::to_string(&ChatFrame {
            content: "Hi",
            done: false,
        })
        .unwrap();
        assert_eq!(json, r#"{"content":"Hi","done":false}"#);
    }

    #[tokio::test]
    async fn dropping_event_stream_cancels_generation() {
        let (tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let events = chunk_events(rx, token.clone().drop_guard());
        tx.send(StreamItem::Chunk("Hel".into())).await.unwrap();

        let mut events = Box::pin(events);
        assert!(events.next().await.is_some());
        assert!(!token.is_cancelled());
        drop(events);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn done_item_ends_stream_without_cancelling() {
        let (tx, rx) = mpsc::channel(2);
        let token = CancellationToken::new();
        tx.send(StreamItem::Chunk("Hi".into())).await.unwrap();
        tx.send(StreamItem::Done).await.unwrap();

        let events: Vec<_> = chunk_events(rx, token.clone().drop_guard())
            .collect()
            .await;
        assert_eq!(events.len(), 2);
        assert!(!token.is_cancelled());
    }
}
