// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for Anthropic Messages API streaming responses.
//!
//! Converts a reqwest response byte stream into typed [`StreamEvent`]s using
//! the `eventsource-stream` crate for SSE protocol compliance.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use switchboard_core::SwitchboardError;

use crate::types::{ApiErrorResponse, SseContentBlockDelta, SseDelta, SseMessageDelta};

/// The streaming events the generator cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A fragment of reply text.
    Text(String),
    /// The model stopped; carries the stop reason when reported.
    Stopped(Option<String>),
    /// The message is complete.
    MessageStop,
    /// API error reported inside the stream.
    Error(String),
}

fn parse_error(event: &str, e: serde_json::Error) -> SwitchboardError {
    SwitchboardError::Generation {
        message: format!("failed to parse {event}: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Parses a streaming response into [`StreamEvent`]s.
///
/// Events that carry no text (`message_start`, `ping`, block boundaries,
/// non-text deltas) and unknown event types are skipped.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, SwitchboardError>> + Send>> {
    let events = response.bytes_stream().eventsource();

    let mapped = events.filter_map(|result| async move {
        let event = match result {
            Ok(event) => event,
            Err(e) => {
                return Some(Err(SwitchboardError::generation(format!(
                    "SSE stream error: {e}"
                ))));
            }
        };

        match event.event.as_str() {
            "content_block_delta" => {
                match serde_json::from_str::<SseContentBlockDelta>(&event.data) {
                    Ok(SseContentBlockDelta {
                        delta: SseDelta::TextDelta { text },
                        ..
                    }) => Some(Ok(StreamEvent::Text(text))),
                    Ok(_) => None,
                    Err(e) => Some(Err(parse_error("content_block_delta", e))),
                }
            }
            "message_delta" => Some(
                serde_json::from_str::<SseMessageDelta>(&event.data)
                    .map(|md| StreamEvent::Stopped(md.delta.stop_reason))
                    .map_err(|e| parse_error("message_delta", e)),
            ),
            "message_stop" => Some(Ok(StreamEvent::MessageStop)),
            "error" => Some(
                serde_json::from_str::<ApiErrorResponse>(&event.data)
                    .map(|err| StreamEvent::Error(err.error.to_string()))
                    .map_err(|e| parse_error("error event", e)),
            ),
            _ => None,
        }
    });

    Box::pin(mapped)
}
