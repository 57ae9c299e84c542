// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation store: lifecycle rules and per-conversation serialization.
//!
//! Every mutation of one conversation runs under that conversation's async
//! mutex, so appends are strictly ordered and timestamps never go backwards.
//! Locks are keyed by id and never shared between conversations, so work on
//! distinct conversations proceeds in parallel. Find-or-create additionally
//! holds a lock keyed by `(customer_id, channel)`, which enforces at most one
//! open conversation per customer and channel.

use std::hash::Hash;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use switchboard_core::StorageAdapter;
use switchboard_core::SwitchboardError;
use switchboard_core::types::{
    Channel, ContextPatch, Conversation, ConversationContext, ConversationStatus, EscalationEntry,
    Industry, Message, NewMessage, Sender,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

/// Result of an [`escalate`](ConversationStore::escalate) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalateOutcome {
    /// The conversation moved from active to escalated and one dispatch event was queued.
    Escalated { queue_id: i64 },
    /// The conversation was already escalated. Nothing changed.
    AlreadyEscalated,
}

/// Result of [`ConversationStore::append`].
#[derive(Debug, Clone, PartialEq)]
pub enum Appended {
    Stored(Message),
    /// The vendor message id was already stored; this is the earlier message.
    Duplicate(Message),
}

impl Appended {
    pub fn into_message(self) -> Message {
        match self {
            Self::Stored(m) | Self::Duplicate(m) => m,
        }
    }
}

type LockMap<K> = DashMap<K, Arc<Mutex<()>>>;

/// Guard for one keyed lock. On release the map entry goes away unless
/// another task holds or awaits the same lock.
struct KeyedGuard<'a, K: Eq + Hash> {
    locks: &'a LockMap<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a, K: Eq + Hash + Clone> KeyedGuard<'a, K> {
    async fn acquire(locks: &'a LockMap<K>, key: K) -> Self {
        // Clone the Arc out before awaiting so no DashMap shard guard is held.
        let lock = locks.entry(key.clone()).or_default().clone();
        let guard = lock.lock_owned().await;
        Self {
            locks,
            key,
            guard: Some(guard),
        }
    }
}

impl<K: Eq + Hash> Drop for KeyedGuard<'_, K> {
    fn drop(&mut self) {
        self.guard.take();
        // Holders and waiters each own a clone, so 1 means only the map is left.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Owns conversation and message entities and their status transitions.
pub struct ConversationStore {
    storage: Arc<dyn StorageAdapter>,
    conversation_locks: LockMap<String>,
    customer_locks: LockMap<(String, Channel)>,
}

impl ConversationStore {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            storage,
            conversation_locks: DashMap::new(),
            customer_locks: DashMap::new(),
        }
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    async fn lock_conversation(&self, id: &str) -> KeyedGuard<'_, String> {
        KeyedGuard::acquire(&self.conversation_locks, id.to_string()).await
    }

    async fn lock_customer(
        &self,
        customer_id: &str,
        channel: Channel,
    ) -> KeyedGuard<'_, (String, Channel)> {
        KeyedGuard::acquire(&self.customer_locks, (customer_id.to_string(), channel)).await
    }

    async fn load(&self, id: &str) -> Result<Conversation, SwitchboardError> {
        self.storage
            .get_conversation(id)
            .await?
            .ok_or_else(|| SwitchboardError::conversation_not_found(id))
    }

    /// Creates a new active conversation and returns its id.
    ///
    /// Fails with `InvalidState` if the customer already has an open
    /// conversation on this channel.
    pub async fn create_conversation(
        &self,
        customer_id: &str,
        channel: Channel,
        industry: Industry,
        company_id: Option<&str>,
    ) -> Result<String, SwitchboardError> {
        let _guard = self.lock_customer(customer_id, channel).await;
        let conversation = self
            .insert_new(customer_id, channel, industry, company_id)
            .await?;
        Ok(conversation.id)
    }

    async fn insert_new(
        &self,
        customer_id: &str,
        channel: Channel,
        industry: Industry,
        company_id: Option<&str>,
    ) -> Result<Conversation, SwitchboardError> {
        if customer_id.trim().is_empty() {
            return Err(SwitchboardError::Validation(
                "customer id must not be empty".into(),
            ));
        }

        let now = Utc::now();
        let conversation = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            channel,
            industry,
            company_id: company_id.map(str::to_string),
            status: ConversationStatus::Active,
            started_at: now,
            ended_at: None,
            last_message_at: now,
            context: ConversationContext::new(industry),
            assigned_agent: None,
            generation_failures: 0,
            message_count: 0,
            messages: Vec::new(),
        };
        self.storage.create_conversation(&conversation).await?;

        info!(
            conversation_id = %conversation.id,
            customer_id,
            channel = %channel,
            industry = %industry,
            "conversation created"
        );
        Ok(conversation)
    }

    /// Returns the customer's open conversation on `channel`, creating one if none exists.
    pub async fn find_or_create(
        &self,
        customer_id: &str,
        channel: Channel,
        industry: Industry,
        company_id: Option<&str>,
    ) -> Result<Conversation, SwitchboardError> {
        let _guard = self.lock_customer(customer_id, channel).await;
        if let Some(existing) = self
            .storage
            .find_open_conversation(customer_id, channel)
            .await?
        {
            debug!(conversation_id = %existing.id, "reusing open conversation");
            return Ok(existing);
        }
        self.insert_new(customer_id, channel, industry, company_id)
            .await
    }

    /// Appends a message and returns it with its assigned id, seq and timestamp.
    ///
    /// AI messages are rejected once the conversation is escalated, and
    /// nothing may be appended to a resolved conversation. A message whose
    /// external id is already stored returns the earlier message unchanged.
    pub async fn add_message(
        &self,
        conversation_id: &str,
        new: NewMessage,
    ) -> Result<Message, SwitchboardError> {
        self.append(conversation_id, new)
            .await
            .map(Appended::into_message)
    }

    /// Like [`add_message`](Self::add_message), but reports redelivered
    /// vendor messages instead of folding them in.
    pub async fn append(
        &self,
        conversation_id: &str,
        new: NewMessage,
    ) -> Result<Appended, SwitchboardError> {
        let _guard = self.lock_conversation(conversation_id).await;
        let conversation = self.load(conversation_id).await?;

        if let Some(external_id) = &new.external_id {
            let existing = self
                .storage
                .find_message_by_external_id(conversation_id, external_id)
                .await?;
            if let Some(existing) = existing {
                debug!(conversation_id, external_id, "message already stored");
                return Ok(Appended::Duplicate(existing));
            }
        }

        match (conversation.status, new.sender) {
            (ConversationStatus::Resolved, _) => {
                return Err(SwitchboardError::InvalidState(format!(
                    "conversation {conversation_id} is resolved"
                )));
            }
            (ConversationStatus::Escalated, Sender::Ai) => {
                return Err(SwitchboardError::InvalidState(format!(
                    "conversation {conversation_id} is escalated; AI replies are closed"
                )));
            }
            _ => {}
        }

        let timestamp = Utc::now().max(conversation.last_message_at);
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            seq: conversation.message_count + 1,
            sender: new.sender,
            content: new.content,
            intent: new.intent,
            confidence: new.confidence,
            timestamp,
            metadata: serde_json::Value::Object(new.metadata),
            external_id: new.external_id,
        };
        self.storage.append_message(&message).await?;

        debug!(
            conversation_id,
            seq = message.seq,
            sender = %message.sender,
            "message appended"
        );
        Ok(Appended::Stored(message))
    }

    /// Chronological history, oldest first. `limit` keeps the most recent N.
    pub async fn get_history(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, SwitchboardError> {
        self.load(conversation_id).await?;
        self.storage.get_messages(conversation_id, limit).await
    }

    /// Shallow-merges `patch` into the conversation context.
    pub async fn update_context(
        &self,
        conversation_id: &str,
        patch: ContextPatch,
    ) -> Result<Conversation, SwitchboardError> {
        let _guard = self.lock_conversation(conversation_id).await;
        let mut conversation = self.load(conversation_id).await?;
        if let Some(industry) = patch.industry {
            conversation.industry = industry;
        }
        conversation.context.merge(patch);
        self.storage.update_conversation(&conversation).await?;
        Ok(conversation)
    }

    /// Hands the conversation to a human. Idempotent.
    ///
    /// The status change and its dispatch-queue event are written together,
    /// so repeated calls produce exactly one transition event.
    pub async fn escalate(
        &self,
        conversation_id: &str,
        reason: &str,
    ) -> Result<EscalateOutcome, SwitchboardError> {
        let _guard = self.lock_conversation(conversation_id).await;
        let conversation = self.load(conversation_id).await?;

        match conversation.status {
            ConversationStatus::Escalated => {
                debug!(conversation_id, "already escalated");
                Ok(EscalateOutcome::AlreadyEscalated)
            }
            ConversationStatus::Resolved => Err(SwitchboardError::InvalidState(format!(
                "conversation {conversation_id} is resolved and cannot be escalated"
            ))),
            ConversationStatus::Active => {
                match self
                    .storage
                    .escalate_conversation(conversation_id, reason)
                    .await?
                {
                    Some(queue_id) => {
                        info!(conversation_id, reason, queue_id, "conversation escalated");
                        Ok(EscalateOutcome::Escalated { queue_id })
                    }
                    None => Ok(EscalateOutcome::AlreadyEscalated),
                }
            }
        }
    }

    /// Closes the conversation. Allowed from active or escalated.
    pub async fn resolve(&self, conversation_id: &str) -> Result<Conversation, SwitchboardError> {
        let _guard = self.lock_conversation(conversation_id).await;
        let mut conversation = self.load(conversation_id).await?;
        if !conversation
            .status
            .can_transition_to(ConversationStatus::Resolved)
        {
            return Err(SwitchboardError::InvalidState(format!(
                "conversation {conversation_id} is already resolved"
            )));
        }
        conversation.status = ConversationStatus::Resolved;
        conversation.ended_at = Some(Utc::now().max(conversation.last_message_at));
        self.storage.update_conversation(&conversation).await?;
        info!(conversation_id, "conversation resolved");
        Ok(conversation)
    }

    /// Records the human agent now handling the conversation.
    pub async fn assign_agent(
        &self,
        conversation_id: &str,
        agent: &str,
    ) -> Result<Conversation, SwitchboardError> {
        if agent.trim().is_empty() {
            return Err(SwitchboardError::Validation(
                "agent must not be empty".into(),
            ));
        }
        let _guard = self.lock_conversation(conversation_id).await;
        let mut conversation = self.load(conversation_id).await?;
        if !conversation.status.is_open() {
            return Err(SwitchboardError::InvalidState(format!(
                "conversation {conversation_id} is resolved"
            )));
        }
        conversation.assigned_agent = Some(agent.to_string());
        self.storage.update_conversation(&conversation).await?;
        info!(conversation_id, agent, "agent assigned");
        Ok(conversation)
    }

    /// Appends a message written by a human agent.
    pub async fn add_agent_message(
        &self,
        conversation_id: &str,
        agent: &str,
        content: &str,
    ) -> Result<Message, SwitchboardError> {
        if content.trim().is_empty() {
            return Err(SwitchboardError::Validation(
                "message content must not be empty".into(),
            ));
        }
        let new = NewMessage::new(Sender::Agent, content)
            .with_metadata("agent", serde_json::Value::String(agent.to_string()));
        self.add_message(conversation_id, new).await
    }

    /// Conversation with its full message log.
    pub async fn get(&self, conversation_id: &str) -> Result<Conversation, SwitchboardError> {
        let mut conversation = self.load(conversation_id).await?;
        conversation.messages = self.storage.get_messages(conversation_id, None).await?;
        Ok(conversation)
    }

    /// Conversation row without messages.
    pub async fn get_summary(
        &self,
        conversation_id: &str,
    ) -> Result<Conversation, SwitchboardError> {
        self.load(conversation_id).await
    }

    pub async fn list(
        &self,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<Conversation>, SwitchboardError> {
        self.storage.list_conversations(status).await
    }

    /// Counts one more consecutive generation failure and returns the new count.
    pub async fn record_generation_failure(
        &self,
        conversation_id: &str,
    ) -> Result<u32, SwitchboardError> {
        let _guard = self.lock_conversation(conversation_id).await;
        let mut conversation = self.load(conversation_id).await?;
        conversation.generation_failures += 1;
        self.storage.update_conversation(&conversation).await?;
        Ok(conversation.generation_failures)
    }

    /// Clears the consecutive failure count after a successful reply.
    pub async fn reset_generation_failures(
        &self,
        conversation_id: &str,
    ) -> Result<(), SwitchboardError> {
        let _guard = self.lock_conversation(conversation_id).await;
        let mut conversation = self.load(conversation_id).await?;
        if conversation.generation_failures != 0 {
            conversation.generation_failures = 0;
            self.storage.update_conversation(&conversation).await?;
        }
        Ok(())
    }

    // --- Escalation dispatch queue ---

    pub async fn next_escalation(&self) -> Result<Option<EscalationEntry>, SwitchboardError> {
        self.storage.dequeue_escalation().await
    }

    pub async fn ack_escalation(&self, id: i64) -> Result<(), SwitchboardError> {
        self.storage.ack_escalation(id).await
    }

    pub async fn fail_escalation(&self, id: i64) -> Result<(), SwitchboardError> {
        self.storage.fail_escalation(id).await
    }

    pub async fn escalations(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<EscalationEntry>, SwitchboardError> {
        self.load(conversation_id).await?;
        self.storage.list_escalations(conversation_id).await
    }
}
