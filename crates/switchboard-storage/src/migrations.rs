// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schema migrations, embedded from `migrations/` with refinery.

use switchboard_core::SwitchboardError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Tables the engine reads and writes.
pub const TABLES: [&str; 4] = ["customers", "conversations", "messages", "escalations"];

/// Applies pending migrations. Already-applied versions are skipped using
/// refinery's `refinery_schema_history` table.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), SwitchboardError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(|e| SwitchboardError::Storage {
            source: Box::new(e),
        })?;
    match report.applied_migrations().as_slice() {
        [] => tracing::debug!("schema up to date"),
        applied => {
            for migration in applied {
                tracing::info!(
                    version = migration.version(),
                    name = %migration.name(),
                    "applied migration"
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migrated() -> rusqlite::Connection {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        conn
    }

    #[test]
    fn creates_every_table() {
        let conn = migrated();
        for table in TABLES {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn second_run_is_a_no_op() {
        let mut conn = migrated();
        run_migrations(&mut conn).unwrap();
    }

    #[test]
    fn one_open_conversation_per_customer_and_channel() {
        let conn = migrated();
        conn.execute(
            "INSERT INTO customers (id, company_id, phone, created_at)
             VALUES ('cust', 'acme', '+1555', '2026-01-01T00:00:00.000Z')",
            [],
        )
        .unwrap();
        let insert = |id: &str, status: &str| {
            conn.execute(
                "INSERT INTO conversations
                 (id, customer_id, channel, industry, status, started_at, last_message_at, context)
                 VALUES (?1, 'cust', 'sms', 'mobile', ?2,
                         '2026-01-01T00:00:00.000Z', '2026-01-01T00:00:00.000Z', '{}')",
                [id, status],
            )
        };
        insert("c1", "resolved").unwrap();
        insert("c2", "active").unwrap();
        assert!(insert("c3", "escalated").is_err());
    }
}
