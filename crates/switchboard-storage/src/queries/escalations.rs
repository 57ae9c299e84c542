// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Escalation transition and the crash-safe human-dispatch queue.

use rusqlite::params;
use switchboard_core::SwitchboardError;
use switchboard_core::types::EscalationEntry;

use crate::database::{Database, map_tr_err};

const ENTRY_COLUMNS: &str = "id, conversation_id, reason, status, attempts, max_attempts, \
     created_at, updated_at, locked_until";

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<EscalationEntry, rusqlite::Error> {
    Ok(EscalationEntry {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        reason: row.get(2)?,
        status: row.get(3)?,
        attempts: row.get(4)?,
        max_attempts: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        locked_until: row.get(8)?,
    })
}

/// Move an active conversation to `escalated` and enqueue its dispatch event.
///
/// Both writes share one transaction. Returns `None` when the conversation was
/// not active, in which case nothing is written.
pub async fn escalate_conversation(
    db: &Database,
    conversation_id: &str,
    reason: &str,
) -> Result<Option<i64>, SwitchboardError> {
    let conversation_id = conversation_id.to_string();
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE conversations SET status = 'escalated'
                 WHERE id = ?1 AND status = 'active'",
                params![conversation_id],
            )?;
            if changed == 0 {
                tx.commit()?;
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO escalations (conversation_id, reason) VALUES (?1, ?2)",
                params![conversation_id, reason],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(Some(id))
        })
        .await
        .map_err(map_tr_err)
}

/// Dequeue the next pending escalation.
///
/// Atomically selects the oldest pending entry and marks it as "processing"
/// with a 5-minute lock. Entries whose lock expired are eligible again.
pub async fn dequeue(db: &Database) -> Result<Option<EscalationEntry>, SwitchboardError> {
    db.connection()
        .call(move |conn| -> Result<Option<EscalationEntry>, rusqlite::Error> {
            let tx = conn.transaction()?;

            let result = tx.query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM escalations
                     WHERE status = 'pending'
                        OR (status = 'processing'
                            AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                     ORDER BY id ASC
                     LIMIT 1"
                ),
                [],
                row_to_entry,
            );

            match result {
                Ok(entry) => {
                    tx.execute(
                        "UPDATE escalations SET status = 'processing',
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+5 minutes'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        params![entry.id],
                    )?;
                    let locked_until: String = tx.query_row(
                        "SELECT locked_until FROM escalations WHERE id = ?1",
                        params![entry.id],
                        |row| row.get(0),
                    )?;
                    tx.commit()?;
                    Ok(Some(EscalationEntry {
                        status: "processing".to_string(),
                        locked_until: Some(locked_until),
                        ..entry
                    }))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an escalation dispatched.
pub async fn ack(db: &Database, id: i64) -> Result<(), SwitchboardError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE escalations SET status = 'completed', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed dispatch attempt.
///
/// Increments attempts. At `max_attempts` the entry is parked as "failed";
/// otherwise it returns to "pending" with its lock cleared.
pub async fn fail(db: &Database, id: i64) -> Result<(), SwitchboardError> {
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let (attempts, max_attempts): (i32, i32) = conn.query_row(
                "SELECT attempts, max_attempts FROM escalations WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            let status = if new_attempts >= max_attempts {
                "failed"
            } else {
                "pending"
            };
            conn.execute(
                "UPDATE escalations SET status = ?1, attempts = ?2,
                 locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![status, new_attempts, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List escalation events for a conversation, oldest first.
pub async fn list_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<EscalationEntry>, SwitchboardError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<EscalationEntry>, rusqlite::Error> {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ENTRY_COLUMNS} FROM escalations WHERE conversation_id = ?1 ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![conversation_id], row_to_entry)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
