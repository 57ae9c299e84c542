// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message append and history reads.

use std::str::FromStr;

use rusqlite::{OptionalExtension, params};
use switchboard_core::SwitchboardError;
use switchboard_core::types::{Message, Sender};

use crate::database::{Database, conversion_err, format_ts, map_tr_err, parse_ts};

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    let sender: String = row.get(3)?;
    let confidence: Option<f64> = row.get(6)?;
    let timestamp: String = row.get(7)?;
    let metadata: String = row.get(8)?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        seq: row.get(2)?,
        sender: Sender::from_str(&sender).map_err(|e| conversion_err(3, e))?,
        content: row.get(4)?,
        intent: row.get(5)?,
        confidence: confidence.map(|c| c as f32),
        timestamp: parse_ts(7, &timestamp)?,
        metadata: serde_json::from_str(&metadata).map_err(|e| conversion_err(8, e))?,
        external_id: row.get(9)?,
    })
}

/// Append a message and advance the owning conversation's counters in one transaction.
///
/// The caller assigns `seq` and `timestamp`; `seq` must be exactly one past the
/// conversation's current message count, otherwise the unique `(conversation_id, seq)`
/// constraint rejects the write.
pub async fn append_message(db: &Database, msg: &Message) -> Result<(), SwitchboardError> {
    let msg = msg.clone();
    let conversation_id = msg.conversation_id.clone();
    let metadata = serde_json::to_string(&msg.metadata).map_err(|e| SwitchboardError::Storage {
        source: Box::new(e),
    })?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            let timestamp = format_ts(&msg.timestamp);
            let updated = tx.execute(
                "UPDATE conversations SET last_message_at = ?1, message_count = ?2
                 WHERE id = ?3",
                params![timestamp, msg.seq, msg.conversation_id],
            )?;
            if updated == 0 {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            tx.execute(
                "INSERT INTO messages (id, conversation_id, seq, sender, content, intent,
                     confidence, timestamp, metadata, external_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.seq,
                    msg.sender.to_string(),
                    msg.content,
                    msg.intent,
                    msg.confidence.map(f64::from),
                    timestamp,
                    metadata,
                    msg.external_id,
                ],
            )?;
            tx.commit()
        })
        .await
        .map_err(|e| match e {
            tokio_rusqlite::Error::Error(rusqlite::Error::QueryReturnedNoRows) => {
                SwitchboardError::conversation_not_found(conversation_id)
            }
            other => map_tr_err(other),
        })
}

/// Get messages for a conversation in chronological order.
///
/// With `limit`, the most recent `limit` messages are returned, still oldest first.
pub async fn get_messages(
    db: &Database,
    conversation_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Message>, SwitchboardError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<Message>, rusqlite::Error> {
            let mut messages = Vec::new();
            match limit {
                Some(lim) => {
                    let mut stmt = conn.prepare(
                        "SELECT * FROM (
                             SELECT id, conversation_id, seq, sender, content, intent,
                                    confidence, timestamp, metadata, external_id
                             FROM messages WHERE conversation_id = ?1
                             ORDER BY seq DESC LIMIT ?2
                         ) ORDER BY seq ASC",
                    )?;
                    let rows = stmt.query_map(params![conversation_id, lim], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, conversation_id, seq, sender, content, intent,
                                confidence, timestamp, metadata, external_id
                         FROM messages WHERE conversation_id = ?1
                         ORDER BY seq ASC",
                    )?;
                    let rows = stmt.query_map(params![conversation_id], row_to_message)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Looks up the message a vendor id was stored under, if any.
pub async fn find_by_external_id(
    db: &Database,
    conversation_id: &str,
    external_id: &str,
) -> Result<Option<Message>, SwitchboardError> {
    let conversation_id = conversation_id.to_string();
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Message>, rusqlite::Error> {
            conn.query_row(
                "SELECT id, conversation_id, seq, sender, content, intent,
                        confidence, timestamp, metadata, external_id
                 FROM messages WHERE conversation_id = ?1 AND external_id = ?2",
                params![conversation_id, external_id],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}
