// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Switchboard conversation engine.

use thiserror::Error;

/// The primary error type used across all Switchboard adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SwitchboardError {
    /// Malformed inbound payload or request body. Never creates a conversation.
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown conversation, customer, or tenant.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Illegal status transition or append (e.g. AI reply on an escalated conversation).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Downstream text-generation failure. Not retried automatically.
    #[error("generation error: {message}")]
    Generation {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors (invalid TOML, missing guideline entries, bad credentials).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (outbound API failure, server bind failure).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SwitchboardError {
    /// Shorthand for a conversation lookup miss.
    pub fn conversation_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "conversation",
            id: id.into(),
        }
    }

    /// Shorthand for a generation failure without an underlying source.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            source: None,
        }
    }

    /// HTTP status code that entry points use when surfacing this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound { .. } => 404,
            Self::InvalidState(_) => 409,
            Self::Generation { .. } => 502,
            Self::Timeout { .. } => 504,
            Self::Config(_)
            | Self::Storage { .. }
            | Self::Channel { .. }
            | Self::Internal(_) => 500,
        }
    }

    /// Whether this error is a generation-side failure that counts toward auto-escalation.
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, Self::Generation { .. } | Self::Timeout { .. })
    }
}
