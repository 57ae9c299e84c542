// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`StorageAdapter`] over the SQLite [`Database`].

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use switchboard_config::model::StorageConfig;
use switchboard_core::types::{
    Channel, Conversation, ConversationStatus, EscalationEntry, Message,
};
use switchboard_core::{AdapterType, HealthStatus, PluginAdapter, StorageAdapter, SwitchboardError};

use crate::database::Database;
use crate::queries;

/// Conversation storage on a single SQLite file.
///
/// Opening is deferred to [`StorageAdapter::initialize`] so `serve` can
/// report a bad path as a startup error instead of panicking in a constructor.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wraps an already-open database. The adapter is initialized immediately.
    pub fn from_database(db: Database) -> Self {
        Self {
            config: StorageConfig {
                database_path: ":memory:".to_string(),
                wal_mode: false,
            },
            db: OnceCell::new_with(Some(db)),
        }
    }

    fn db(&self) -> Result<&Database, SwitchboardError> {
        self.db.get().ok_or_else(|| SwitchboardError::Storage {
            source: "sqlite storage used before initialize()".into(),
        })
    }

    async fn checkpoint(&self) -> Result<(), SwitchboardError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SwitchboardError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SwitchboardError> {
        self.checkpoint().await
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SwitchboardError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| SwitchboardError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), SwitchboardError> {
        self.db()?;
        self.checkpoint().await
    }

    // --- Conversation operations ---

    async fn create_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<(), SwitchboardError> {
        queries::conversations::create_conversation(self.db()?, conversation).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SwitchboardError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn find_open_conversation(
        &self,
        customer_id: &str,
        channel: Channel,
    ) -> Result<Option<Conversation>, SwitchboardError> {
        queries::conversations::find_open_conversation(self.db()?, customer_id, channel).await
    }

    async fn list_conversations(
        &self,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, SwitchboardError> {
        queries::conversations::list_conversations(self.db()?, status).await
    }

    async fn update_conversation(
        &self,
        conversation: &Conversation,
    ) -> Result<(), SwitchboardError> {
        queries::conversations::update_conversation(self.db()?, conversation).await
    }

    // --- Message operations ---

    async fn append_message(&self, message: &Message) -> Result<(), SwitchboardError> {
        queries::messages::append_message(self.db()?, message).await
    }

    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, SwitchboardError> {
        queries::messages::get_messages(self.db()?, conversation_id, limit).await
    }

    async fn find_message_by_external_id(
        &self,
        conversation_id: &str,
        external_id: &str,
    ) -> Result<Option<Message>, SwitchboardError> {
        queries::messages::find_by_external_id(self.db()?, conversation_id, external_id).await
    }

    // --- Customer directory ---

    async fn resolve_customer(
        &self,
        company_id: Option<&str>,
        phone: &str,
    ) -> Result<String, SwitchboardError> {
        queries::customers::resolve_customer(self.db()?, company_id, phone).await
    }

    // --- Escalation dispatch queue ---

    async fn escalate_conversation(
        &self,
        conversation_id: &str,
        reason: &str,
    ) -> Result<Option<i64>, SwitchboardError> {
        queries::escalations::escalate_conversation(self.db()?, conversation_id, reason).await
    }

    async fn dequeue_escalation(&self) -> Result<Option<EscalationEntry>, SwitchboardError> {
        queries::escalations::dequeue(self.db()?).await
    }

    async fn ack_escalation(&self, id: i64) -> Result<(), SwitchboardError> {
        queries::escalations::ack(self.db()?, id).await
    }

    async fn fail_escalation(&self, id: i64) -> Result<(), SwitchboardError> {
        queries::escalations::fail(self.db()?, id).await
    }

    async fn list_escalations(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<EscalationEntry>, SwitchboardError> {
        queries::escalations::list_for_conversation(self.db()?, conversation_id).await
    }
}
