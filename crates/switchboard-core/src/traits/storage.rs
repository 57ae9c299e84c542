// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the durable conversation store.

use async_trait::async_trait;

use crate::error::SwitchboardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Channel, Conversation, ConversationStatus, EscalationEntry, Message};

/// Adapter for durable persistence of conversations and messages.
///
/// Storage adapters are row stores only. Ordering, locking and transition
/// rules live in the conversation store that sits on top.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), SwitchboardError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), SwitchboardError>;

    // --- Conversation operations ---

    /// Inserts a new conversation row.
    async fn create_conversation(&self, conversation: &Conversation)
        -> Result<(), SwitchboardError>;

    /// Gets a conversation by id, without its messages.
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, SwitchboardError>;

    /// Finds the open (active or escalated) conversation for a customer on a channel.
    async fn find_open_conversation(
        &self,
        customer_id: &str,
        channel: Channel,
    ) -> Result<Option<Conversation>, SwitchboardError>;

    /// Lists conversations, optionally filtered by status, newest activity first.
    async fn list_conversations(
        &self,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, SwitchboardError>;

    /// Overwrites the mutable fields of a conversation row.
    async fn update_conversation(&self, conversation: &Conversation)
        -> Result<(), SwitchboardError>;

    // --- Message operations ---

    /// Appends a message row and advances the conversation's counters atomically.
    async fn append_message(&self, message: &Message) -> Result<(), SwitchboardError>;

    /// Gets messages for a conversation in chronological order.
    ///
    /// With `limit`, returns the most recent `limit` messages, still oldest first.
    async fn get_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, SwitchboardError>;

    /// Finds the message stored under a vendor message id in this conversation.
    async fn find_message_by_external_id(
        &self,
        conversation_id: &str,
        external_id: &str,
    ) -> Result<Option<Message>, SwitchboardError>;

    // --- Customer directory ---

    /// Returns the canonical customer id for a phone number, creating it on first sight.
    async fn resolve_customer(
        &self,
        company_id: Option<&str>,
        phone: &str,
    ) -> Result<String, SwitchboardError>;

    // --- Escalation dispatch queue ---

    /// Moves an active conversation to escalated and enqueues its dispatch event
    /// in one transaction.
    ///
    /// Returns the queue entry id, or `None` when the conversation was not active
    /// (nothing changed, nothing enqueued).
    async fn escalate_conversation(
        &self,
        conversation_id: &str,
        reason: &str,
    ) -> Result<Option<i64>, SwitchboardError>;

    /// Takes the next pending escalation for a human dispatcher.
    async fn dequeue_escalation(&self) -> Result<Option<EscalationEntry>, SwitchboardError>;

    /// Marks an escalation dispatched.
    async fn ack_escalation(&self, id: i64) -> Result<(), SwitchboardError>;

    /// Returns an escalation to the queue, or fails it permanently after max attempts.
    async fn fail_escalation(&self, id: i64) -> Result<(), SwitchboardError>;

    /// Lists escalation events for a conversation, oldest first.
    async fn list_escalations(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<EscalationEntry>, SwitchboardError>;
}
