// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-message orchestration pipeline.
//!
//! store customer message -> classify -> escalation policy -> either hand off
//! to a human, or generate a reply (blocking or streamed) and store it.
//!
//! The pipeline is channel-agnostic. Channels shape text through
//! [`ChannelAdapter::shape_reply`] before it is stored, so the stored AI
//! message is always what the customer actually received.

use std::sync::Arc;

use futures::StreamExt;
use switchboard_config::model::SwitchboardConfig;
use switchboard_context::ResponseGenerator;
use switchboard_core::types::{
    Conversation, ConversationStatus, InboundMessage, IntentResult, NewMessage, OutboundMessage,
    Prompt,
};
use switchboard_core::{
    ChannelAdapter, ContextPatch, GenerationAdapter, IntentClassifier, SwitchboardError, TextStream,
};
use switchboard_router::{EscalationPolicy, EscalationReason};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::store::{Appended, ConversationStore, EscalateOutcome};

/// Canned texts and limits used by the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// History entries loaded for prompt context.
    pub history_limit: i64,
    pub handoff_message: String,
    pub apology_message: String,
    /// Consecutive generation failures that trigger auto-escalation.
    pub max_generation_failures: u32,
}

impl PipelineSettings {
    pub fn from_config(config: &SwitchboardConfig) -> Self {
        Self {
            history_limit: config.prompt.history_limit,
            handoff_message: config.agent.handoff_message.clone(),
            apology_message: config.agent.apology_message.clone(),
            max_generation_failures: config.escalation.max_generation_failures,
        }
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnKind {
    /// A generated reply was stored (possibly partial, for interrupted streams).
    Replied,
    /// Generation failed and the apology was stored instead.
    Apologized,
    /// The conversation was handed to a human during this turn.
    Escalated(EscalationReason),
    /// The conversation already belongs to a human; no automated reply.
    AwaitingAgent,
    /// The vendor redelivered a message that was already handled.
    Duplicate,
}

/// Result of one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub conversation_id: String,
    pub kind: TurnKind,
    /// Texts for the customer, in order. Each one is already stored.
    pub replies: Vec<String>,
}

impl TurnOutcome {
    /// Whether the channel should send anything back.
    pub fn should_respond(&self) -> bool {
        !self.replies.is_empty()
    }

    /// All replies as one block, for channels that answer once.
    pub fn reply_text(&self) -> String {
        self.replies.join("\n\n")
    }
}

/// One event of a streamed turn.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Chunk(String),
    /// Final event; everything streamed before it is stored.
    Done,
}

/// A turn on a streaming channel.
#[derive(Debug)]
pub enum StreamingTurn {
    /// Nothing to stream (hand-off, awaiting agent, or failure before the first chunk).
    Complete(TurnOutcome),
    /// Generation is running; chunks arrive on `items`, ending with [`StreamItem::Done`].
    ///
    /// Dropping `items` or cancelling the token stops generation promptly.
    Streaming {
        conversation_id: String,
        items: mpsc::Receiver<StreamItem>,
    },
}

/// State after the customer message is stored.
enum Prepared {
    Done(TurnOutcome),
    Generate {
        conversation: Conversation,
        intent: IntentResult,
        prompt: Prompt,
    },
}

/// Shared pieces the streaming task needs after the request handler returns.
#[derive(Clone)]
struct Finisher {
    store: Arc<ConversationStore>,
    settings: PipelineSettings,
}

/// Orchestrates one inbound message end to end.
pub struct Pipeline {
    store: Arc<ConversationStore>,
    classifier: Arc<dyn IntentClassifier>,
    policy: EscalationPolicy,
    generator: ResponseGenerator,
    settings: PipelineSettings,
    streams: TaskTracker,
}

impl Pipeline {
    pub fn new(
        store: Arc<ConversationStore>,
        classifier: Arc<dyn IntentClassifier>,
        policy: EscalationPolicy,
        generator: ResponseGenerator,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            classifier,
            policy,
            generator,
            settings,
            streams: TaskTracker::new(),
        }
    }

    /// Wires a pipeline from configuration.
    pub fn from_config(
        config: &SwitchboardConfig,
        store: Arc<ConversationStore>,
        classifier: Arc<dyn IntentClassifier>,
        backend: Arc<dyn GenerationAdapter>,
    ) -> Result<Self, SwitchboardError> {
        Ok(Self::new(
            store,
            classifier,
            EscalationPolicy::from_config(&config.escalation)?,
            ResponseGenerator::from_config(config, backend)?,
            PipelineSettings::from_config(config),
        ))
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// In-flight streaming tasks, drained on shutdown.
    pub fn streams(&self) -> &TaskTracker {
        &self.streams
    }

    fn finisher(&self) -> Finisher {
        Finisher {
            store: self.store.clone(),
            settings: self.settings.clone(),
        }
    }

    /// Runs a turn with a blocking generation and delivers the replies
    /// through `channel`.
    pub async fn handle(
        &self,
        inbound: InboundMessage,
        channel: &dyn ChannelAdapter,
    ) -> Result<TurnOutcome, SwitchboardError> {
        let outcome = match self.prepare(&inbound, channel).await? {
            Prepared::Done(outcome) => outcome,
            Prepared::Generate {
                conversation,
                intent,
                prompt,
            } => match self.generator.generate_response(prompt).await {
                Ok(text) => {
                    let shaped = channel.shape_reply(&text);
                    self.finisher()
                        .store_reply(&conversation.id, &intent, shaped, None)
                        .await?
                }
                Err(e) if e.is_generation_failure() => {
                    warn!(conversation_id = %conversation.id, error = %e, "generation failed, apologizing");
                    self.finisher().apologize(&conversation.id, channel).await?
                }
                Err(e) => return Err(e),
            },
        };

        self.dispatch(&inbound, &outcome, channel).await?;
        Ok(outcome)
    }

    /// Runs a turn with streaming generation.
    ///
    /// Replies are not sent through `channel`; the caller forwards
    /// [`StreamingTurn`] events itself. `channel` still shapes canned texts.
    pub async fn handle_streaming(
        &self,
        inbound: InboundMessage,
        channel: &dyn ChannelAdapter,
        cancel: CancellationToken,
    ) -> Result<StreamingTurn, SwitchboardError> {
        let (conversation, intent, prompt) = match self.prepare(&inbound, channel).await? {
            Prepared::Done(outcome) => return Ok(StreamingTurn::Complete(outcome)),
            Prepared::Generate {
                conversation,
                intent,
                prompt,
            } => (conversation, intent, prompt),
        };

        let chunks = match self.generator.generate_streaming_response(prompt).await {
            Ok(chunks) => chunks,
            Err(e) if e.is_generation_failure() => {
                warn!(conversation_id = %conversation.id, error = %e, "stream failed to start, apologizing");
                let outcome = self.finisher().apologize(&conversation.id, channel).await?;
                return Ok(StreamingTurn::Complete(outcome));
            }
            Err(e) => return Err(e),
        };

        // Capacity 1: at most one chunk is buffered ahead of the consumer.
        let (tx, rx) = mpsc::channel(1);
        let finisher = self.finisher();
        let conversation_id = conversation.id.clone();
        let handoff = channel.shape_reply(&self.settings.handoff_message);
        let apology = channel.shape_reply(&self.settings.apology_message);
        self.streams.spawn(async move {
            finisher
                .run_stream(conversation.id, intent, chunks, tx, cancel, apology, handoff)
                .await;
        });

        Ok(StreamingTurn::Streaming {
            conversation_id,
            items: rx,
        })
    }

    /// Finds the conversation for an inbound message.
    ///
    /// An explicit conversation id must exist and belong to the sender. If it
    /// names a resolved conversation, the customer starts a fresh one.
    async fn conversation_for(
        &self,
        inbound: &InboundMessage,
    ) -> Result<Conversation, SwitchboardError> {
        if let Some(id) = &inbound.conversation_id {
            let conversation = self.store.get_summary(id).await?;
            if conversation.customer_id != inbound.customer_id
                || conversation.channel != inbound.channel
            {
                return Err(SwitchboardError::Validation(format!(
                    "conversation {id} does not belong to this customer and channel"
                )));
            }
            if conversation.status.is_open() {
                return Ok(conversation);
            }
            debug!(conversation_id = %id, "conversation is resolved, starting a new one");
        }

        self.store
            .find_or_create(
                &inbound.customer_id,
                inbound.channel,
                inbound.industry,
                inbound.company_id.as_deref(),
            )
            .await
    }

    async fn prepare(
        &self,
        inbound: &InboundMessage,
        channel: &dyn ChannelAdapter,
    ) -> Result<Prepared, SwitchboardError> {
        let text = inbound.text.trim();
        if text.is_empty() {
            return Err(SwitchboardError::Validation(
                "message text must not be empty".into(),
            ));
        }

        let conversation = self.conversation_for(inbound).await?;
        let id = conversation.id.clone();

        let intent = self
            .classifier
            .detect_intent(text, conversation.industry)
            .await;
        switchboard_prometheus::record_intent(&intent.intent);

        // Loaded before the new message is stored, so the prompt never repeats it.
        let history = self
            .store
            .get_history(&id, Some(self.settings.history_limit))
            .await?;

        let customer = NewMessage::customer(text)
            .with_intent(&intent)
            .with_external_id(inbound.external_id.clone());
        if let Appended::Duplicate(earlier) = self.store.append(&id, customer).await? {
            info!(conversation_id = %id, message_id = %earlier.id, "redelivered message ignored");
            return Ok(Prepared::Done(TurnOutcome {
                conversation_id: id,
                kind: TurnKind::Duplicate,
                replies: Vec::new(),
            }));
        }
        switchboard_prometheus::record_message(&inbound.channel.to_string());
        self.store
            .update_context(&id, ContextPatch::intent(intent.intent.clone()))
            .await?;

        if conversation.status == ConversationStatus::Escalated {
            debug!(conversation_id = %id, "conversation is with a human, no automated reply");
            return Ok(Prepared::Done(awaiting_agent(id)));
        }

        let decision = self.policy.evaluate(&intent, text);
        debug!(
            conversation_id = %id,
            intent = %intent.intent,
            confidence = intent.confidence,
            escalate = decision.escalate,
            "intent classified"
        );

        if let Some(reason) = decision.reason {
            let handoff = channel.shape_reply(&self.settings.handoff_message);
            let outcome = self.finisher().escalate(&id, reason, handoff).await?;
            return Ok(Prepared::Done(outcome));
        }

        let prompt =
            self.generator
                .build_prompt(text, conversation.industry, Some(&intent.intent), &history);
        Ok(Prepared::Generate {
            conversation,
            intent,
            prompt,
        })
    }

    async fn dispatch(
        &self,
        inbound: &InboundMessage,
        outcome: &TurnOutcome,
        channel: &dyn ChannelAdapter,
    ) -> Result<(), SwitchboardError> {
        for reply in &outcome.replies {
            let message = OutboundMessage {
                conversation_id: outcome.conversation_id.clone(),
                channel: inbound.channel,
                recipient: inbound.reply_to.clone(),
                company_id: inbound.company_id.clone(),
                text: reply.clone(),
            };
            let id = channel.send(message).await.inspect_err(|e| {
                error!(
                    conversation_id = %outcome.conversation_id,
                    channel = %inbound.channel,
                    error = %e,
                    "failed to deliver reply"
                );
            })?;
            switchboard_prometheus::record_reply(&inbound.channel.to_string());
            debug!(conversation_id = %outcome.conversation_id, message_id = %id.0, "reply delivered");
        }
        Ok(())
    }
}

fn awaiting_agent(conversation_id: String) -> TurnOutcome {
    TurnOutcome {
        conversation_id,
        kind: TurnKind::AwaitingAgent,
        replies: Vec::new(),
    }
}

/// How a stream stopped.
enum StreamEnd {
    Completed,
    Cancelled,
    Failed(SwitchboardError),
}

impl Finisher {
    /// Escalates and stores the hand-off notice.
    ///
    /// If another turn escalated first, its hand-off already went out and
    /// this turn sends nothing.
    async fn escalate(
        &self,
        conversation_id: &str,
        reason: EscalationReason,
        handoff: String,
    ) -> Result<TurnOutcome, SwitchboardError> {
        match self.store.escalate(conversation_id, reason.label()).await? {
            EscalateOutcome::Escalated { .. } => {
                info!(conversation_id, reason = %reason, "escalating to a human agent");
                switchboard_prometheus::record_escalation(reason.label());
            }
            EscalateOutcome::AlreadyEscalated => {
                return Ok(awaiting_agent(conversation_id.to_string()));
            }
        }

        let notice = NewMessage::system(handoff.clone())
            .with_metadata("handoff", true.into())
            .with_metadata("reason", reason.label().into());
        self.store.add_message(conversation_id, notice).await?;

        Ok(TurnOutcome {
            conversation_id: conversation_id.to_string(),
            kind: TurnKind::Escalated(reason),
            replies: vec![handoff],
        })
    }

    /// Stores a generated reply and clears the failure counter.
    ///
    /// If a concurrent turn escalated the conversation meanwhile, the reply
    /// is dropped.
    async fn store_reply(
        &self,
        conversation_id: &str,
        intent: &IntentResult,
        text: String,
        partial: Option<bool>,
    ) -> Result<TurnOutcome, SwitchboardError> {
        let mut reply = NewMessage::ai(text.clone());
        reply.intent = Some(intent.intent.clone());
        if let Some(partial) = partial {
            reply = reply.with_metadata("partial", partial.into());
        }

        match self.store.add_message(conversation_id, reply).await {
            Ok(_) => {}
            Err(SwitchboardError::InvalidState(reason)) => {
                warn!(conversation_id, %reason, "dropping AI reply");
                return Ok(awaiting_agent(conversation_id.to_string()));
            }
            Err(e) => return Err(e),
        }
        if partial != Some(true) {
            self.store.reset_generation_failures(conversation_id).await?;
        }

        Ok(TurnOutcome {
            conversation_id: conversation_id.to_string(),
            kind: TurnKind::Replied,
            replies: vec![text],
        })
    }

    /// Counts a failure, then auto-escalates if the limit is reached.
    async fn count_failure(
        &self,
        conversation_id: &str,
        mut replies: Vec<String>,
        handoff: String,
    ) -> Result<TurnOutcome, SwitchboardError> {
        let failures = self.store.record_generation_failure(conversation_id).await?;
        if failures < self.settings.max_generation_failures {
            return Ok(TurnOutcome {
                conversation_id: conversation_id.to_string(),
                kind: TurnKind::Apologized,
                replies,
            });
        }

        let escalated = self
            .escalate(
                conversation_id,
                EscalationReason::RepeatedGenerationFailure(failures),
                handoff,
            )
            .await?;
        replies.extend(escalated.replies);
        Ok(TurnOutcome {
            conversation_id: conversation_id.to_string(),
            kind: escalated.kind,
            replies,
        })
    }

    /// Stores the apology in place of a failed generation.
    async fn apologize(
        &self,
        conversation_id: &str,
        channel: &dyn ChannelAdapter,
    ) -> Result<TurnOutcome, SwitchboardError> {
        let apology = channel.shape_reply(&self.settings.apology_message);
        let handoff = channel.shape_reply(&self.settings.handoff_message);
        self.apologize_with(conversation_id, apology, handoff).await
    }

    async fn apologize_with(
        &self,
        conversation_id: &str,
        apology: String,
        handoff: String,
    ) -> Result<TurnOutcome, SwitchboardError> {
        let message = NewMessage::ai(apology.clone()).with_metadata("fallback", true.into());
        match self.store.add_message(conversation_id, message).await {
            Ok(_) => {}
            Err(SwitchboardError::InvalidState(reason)) => {
                warn!(conversation_id, %reason, "dropping apology");
                return Ok(awaiting_agent(conversation_id.to_string()));
            }
            Err(e) => return Err(e),
        }
        self.count_failure(conversation_id, vec![apology], handoff)
            .await
    }

    /// Drives a generation stream to the consumer and stores the result.
    ///
    /// On cancellation or failure whatever was forwarded is stored as a
    /// partial AI message. A failure with nothing forwarded stores and
    /// streams the apology instead.
    #[allow(clippy::too_many_arguments)]
    async fn run_stream(
        self,
        conversation_id: String,
        intent: IntentResult,
        mut chunks: TextStream,
        tx: mpsc::Sender<StreamItem>,
        cancel: CancellationToken,
        apology: String,
        handoff: String,
    ) {
        let id = conversation_id.as_str();
        let mut streamed = String::new();

        let end = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break StreamEnd::Cancelled,
                _ = tx.closed() => break StreamEnd::Cancelled,
                item = chunks.next() => match item {
                    Some(Ok(chunk)) => {
                        if tx.send(StreamItem::Chunk(chunk.clone())).await.is_err() {
                            break StreamEnd::Cancelled;
                        }
                        streamed.push_str(&chunk);
                    }
                    Some(Err(e)) => break StreamEnd::Failed(e),
                    None => break StreamEnd::Completed,
                },
            }
        };
        // Dropping the stream cancels the in-flight generation request.
        drop(chunks);

        let result = match end {
            StreamEnd::Completed if !streamed.is_empty() => self
                .store_reply(id, &intent, streamed, None)
                .await
                .map(|_| ()),
            StreamEnd::Completed => {
                warn!(conversation_id = %id, "generation stream ended empty");
                self.finish_failed(id, &tx, apology, handoff).await
            }
            StreamEnd::Cancelled => {
                info!(conversation_id = %id, chars = streamed.chars().count(), "stream cancelled by consumer");
                if streamed.is_empty() {
                    Ok(())
                } else {
                    self.store_reply(id, &intent, streamed, Some(true))
                        .await
                        .map(|_| ())
                }
            }
            StreamEnd::Failed(e) => {
                warn!(conversation_id = %id, error = %e, "generation stream failed");
                if streamed.is_empty() {
                    self.finish_failed(id, &tx, apology, handoff).await
                } else {
                    self.finish_partial(id, &intent, streamed, &tx, handoff)
                        .await
                }
            }
        };

        if let Err(e) = result {
            error!(conversation_id = %id, error = %e, "failed to store streamed reply");
        }
        let _ = tx.send(StreamItem::Done).await;
    }

    /// Part of the reply reached the customer before the failure: keep it,
    /// count the failure, and forward the hand-off if that escalates.
    async fn finish_partial(
        &self,
        conversation_id: &str,
        intent: &IntentResult,
        streamed: String,
        tx: &mpsc::Sender<StreamItem>,
        handoff: String,
    ) -> Result<(), SwitchboardError> {
        let stored = self
            .store_reply(conversation_id, intent, streamed, Some(true))
            .await?;
        if stored.kind == TurnKind::AwaitingAgent {
            return Ok(());
        }
        let outcome = self
            .count_failure(conversation_id, Vec::new(), handoff)
            .await?;
        for reply in outcome.replies {
            if tx.send(StreamItem::Chunk(format!("\n\n{reply}"))).await.is_err() {
                break;
            }
        }
        Ok(())
    }

    /// Nothing usable was streamed: store and forward the apology.
    async fn finish_failed(
        &self,
        conversation_id: &str,
        tx: &mpsc::Sender<StreamItem>,
        apology: String,
        handoff: String,
    ) -> Result<(), SwitchboardError> {
        let outcome = self
            .apologize_with(conversation_id, apology, handoff)
            .await?;
        for (i, reply) in outcome.replies.into_iter().enumerate() {
            let text = if i == 0 { reply } else { format!("\n\n{reply}") };
            if tx.send(StreamItem::Chunk(text)).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}
