// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD operations.

use std::str::FromStr;

use rusqlite::{OptionalExtension, params};
use switchboard_core::SwitchboardError;
use switchboard_core::types::{Channel, Conversation, ConversationStatus, Industry};

use crate::database::{Database, conversion_err, format_ts, map_tr_err, parse_ts};

const CONVERSATION_COLUMNS: &str = "id, customer_id, channel, industry, company_id, status, \
     started_at, ended_at, last_message_at, context, assigned_agent, generation_failures, \
     message_count";

/// Decodes one `conversations` row selected with [`CONVERSATION_COLUMNS`].
fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, rusqlite::Error> {
    let channel: String = row.get(2)?;
    let industry: String = row.get(3)?;
    let status: String = row.get(5)?;
    let started_at: String = row.get(6)?;
    let ended_at: Option<String> = row.get(7)?;
    let last_message_at: String = row.get(8)?;
    let context: String = row.get(9)?;
    let generation_failures: i64 = row.get(11)?;

    Ok(Conversation {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        channel: Channel::from_str(&channel).map_err(|e| conversion_err(2, e))?,
        industry: Industry::from_str(&industry).map_err(|e| conversion_err(3, e))?,
        company_id: row.get(4)?,
        status: ConversationStatus::from_str(&status).map_err(|e| conversion_err(5, e))?,
        started_at: parse_ts(6, &started_at)?,
        ended_at: ended_at.as_deref().map(|s| parse_ts(7, s)).transpose()?,
        last_message_at: parse_ts(8, &last_message_at)?,
        context: serde_json::from_str(&context).map_err(|e| conversion_err(9, e))?,
        assigned_agent: row.get(10)?,
        generation_failures: u32::try_from(generation_failures).unwrap_or(u32::MAX),
        message_count: row.get(12)?,
        messages: Vec::new(),
    })
}

fn encode_context(conversation: &Conversation) -> Result<String, SwitchboardError> {
    serde_json::to_string(&conversation.context).map_err(|e| SwitchboardError::Storage {
        source: Box::new(e),
    })
}

/// Insert a new conversation.
///
/// Fails with `InvalidState` when the customer already has an open
/// conversation on the same channel.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), SwitchboardError> {
    let conv = conversation.clone();
    let context = encode_context(conversation)?;
    let customer_id = conversation.customer_id.clone();
    let channel = conversation.channel;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO conversations (id, customer_id, channel, industry, company_id, status,
                     started_at, ended_at, last_message_at, context, assigned_agent,
                     generation_failures, message_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    conv.id,
                    conv.customer_id,
                    conv.channel.to_string(),
                    conv.industry.to_string(),
                    conv.company_id,
                    conv.status.to_string(),
                    format_ts(&conv.started_at),
                    conv.ended_at.as_ref().map(format_ts),
                    format_ts(&conv.last_message_at),
                    context,
                    conv.assigned_agent,
                    conv.generation_failures,
                    conv.message_count,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                SwitchboardError::InvalidState(format!(
                    "customer {customer_id} already has an open {channel} conversation"
                ))
            }
            other => map_tr_err(other),
        })
}

/// Get a conversation by ID, without messages.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, SwitchboardError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            conn.query_row(
                &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
                params![id],
                row_to_conversation,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Find the open (active or escalated) conversation for a customer on a channel.
pub async fn find_open_conversation(
    db: &Database,
    customer_id: &str,
    channel: Channel,
) -> Result<Option<Conversation>, SwitchboardError> {
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Conversation>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE customer_id = ?1 AND channel = ?2 AND status != 'resolved'"
                ),
                params![customer_id, channel.to_string()],
                row_to_conversation,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List conversations, optionally filtered by status, most recent activity first.
pub async fn list_conversations(
    db: &Database,
    status: Option<ConversationStatus>,
) -> Result<Vec<Conversation>, SwitchboardError> {
    db.connection()
        .call(move |conn| -> Result<Vec<Conversation>, rusqlite::Error> {
            let mut conversations = Vec::new();
            match status {
                Some(status) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {CONVERSATION_COLUMNS} FROM conversations
                         WHERE status = ?1 ORDER BY last_message_at DESC"
                    ))?;
                    let rows = stmt.query_map(params![status.to_string()], row_to_conversation)?;
                    for row in rows {
                        conversations.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {CONVERSATION_COLUMNS} FROM conversations
                         ORDER BY last_message_at DESC"
                    ))?;
                    let rows = stmt.query_map([], row_to_conversation)?;
                    for row in rows {
                        conversations.push(row?);
                    }
                }
            }
            Ok(conversations)
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the mutable fields of a conversation.
///
/// Message counters are owned by message appends and are not touched here.
pub async fn update_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), SwitchboardError> {
    let conv = conversation.clone();
    let context = encode_context(conversation)?;
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE conversations SET industry = ?1, status = ?2, ended_at = ?3,
                     context = ?4, assigned_agent = ?5, generation_failures = ?6
                 WHERE id = ?7",
                params![
                    conv.industry.to_string(),
                    conv.status.to_string(),
                    conv.ended_at.as_ref().map(format_ts),
                    context,
                    conv.assigned_agent,
                    conv.generation_failures,
                    conv.id,
                ],
            )
        })
        .await
        .map_err(map_tr_err)?;

    if updated == 0 {
        return Err(SwitchboardError::conversation_not_found(&conversation.id));
    }
    Ok(())
}
