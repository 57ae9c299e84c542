// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical customer identities for phone-based channels.

use rusqlite::params;
use switchboard_core::SwitchboardError;
use switchboard_core::types::normalize_phone_number;

use crate::database::{Database, map_tr_err};

/// Returns the canonical customer id for `phone` under `company_id`,
/// creating one on first contact. Formatting in `phone` is ignored.
pub async fn resolve_customer(
    db: &Database,
    company_id: Option<&str>,
    phone: &str,
) -> Result<String, SwitchboardError> {
    let company_id = company_id.unwrap_or_default().to_string();
    let phone = normalize_phone_number(phone);
    if phone.is_empty() {
        return Err(SwitchboardError::Validation(
            "customer phone number must not be empty".into(),
        ));
    }
    let candidate = uuid::Uuid::new_v4().to_string();
    db.connection()
        .call(move |conn| -> Result<String, rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO customers (id, company_id, phone) VALUES (?1, ?2, ?3)",
                params![candidate, company_id, phone],
            )?;
            conn.query_row(
                "SELECT id FROM customers WHERE company_id = ?1 AND phone = ?2",
                params![company_id, phone],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_phone_resolves_to_same_customer() {
        let db = Database::open_in_memory().await.unwrap();
        let first = resolve_customer(&db, Some("acme"), "+15550001").await.unwrap();
        let again = resolve_customer(&db, Some("acme"), " +15550001 ").await.unwrap();
        assert_eq!(first, again);
    }

    #[tokio::test]
    async fn tenants_do_not_share_customers() {
        let db = Database::open_in_memory().await.unwrap();
        let acme = resolve_customer(&db, Some("acme"), "+15550001").await.unwrap();
        let globex = resolve_customer(&db, Some("globex"), "+15550001").await.unwrap();
        let none = resolve_customer(&db, None, "+15550001").await.unwrap();
        assert_ne!(acme, globex);
        assert_ne!(acme, none);
    }

    #[tokio::test]
    async fn empty_phone_is_a_validation_error() {
        let db = Database::open_in_memory().await.unwrap();
        let err = resolve_customer(&db, None, "  ").await.unwrap_err();
        assert!(matches!(err, SwitchboardError::Validation(_)));
        let err = resolve_customer(&db, None, "(-)").await.unwrap_err();
        assert!(matches!(err, SwitchboardError::Validation(_)));
    }

    #[tokio::test]
    async fn formatting_differences_resolve_to_one_customer() {
        let db = Database::open_in_memory().await.unwrap();
        let plain = resolve_customer(&db, Some("acme"), "+15550101").await.unwrap();
        for formatted in ["+1 555-0101", "+1 (555) 0101", "+1.555.0101"] {
            let id = resolve_customer(&db, Some("acme"), formatted).await.unwrap();
            assert_eq!(id, plain, "{formatted}");
        }
    }
}
