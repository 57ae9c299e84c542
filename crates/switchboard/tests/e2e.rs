// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end integration tests for the orchestration pipeline.
//!
//! Each test creates an isolated TestHarness with temp SQLite, a scripted
//! generator and mock channels. Tests are independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use switchboard_agent::{StreamItem, StreamingTurn, TurnKind};
use switchboard_core::SwitchboardError;
use switchboard_core::types::{Channel, ConversationStatus, Sender};
use switchboard_router::EscalationReason;
use switchboard_test_utils::{Scripted, TestHarness, chunk_text, collect_items};
use tokio_util::sync::CancellationToken;

fn streaming(turn: StreamingTurn) -> (String, tokio::sync::mpsc::Receiver<StreamItem>) {
    match turn {
        StreamingTurn::Streaming {
            conversation_id,
            items,
        } => (conversation_id, items),
        StreamingTurn::Complete(outcome) => panic!("expected a stream, got {outcome:?}"),
    }
}

// ---- Blocking turns ----

#[tokio::test]
async fn mobile_balance_question_is_answered_and_stored() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["You have 2GB of data left.".to_string()])
        .build()
        .await
        .unwrap();

    let outcome = harness
        .send(Channel::Sms, "+15550101", "what's my balance")
        .await
        .unwrap();
    assert_eq!(outcome.kind, TurnKind::Replied);

    let sent = harness.sms.sent_messages().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "+15550101");
    assert_eq!(sent[0].text, "You have 2GB of data left.");

    let conversation = harness.store.get(&outcome.conversation_id).await.unwrap();
    assert_eq!(conversation.status, ConversationStatus::Active);
    assert_eq!(conversation.context.intent.as_deref(), Some("balance_check"));
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[0].sender, Sender::Customer);
    assert_eq!(conversation.messages[0].intent.as_deref(), Some("balance_check"));
    assert_eq!(conversation.messages[1].sender, Sender::Ai);
    assert_eq!(conversation.messages[1].content, "You have 2GB of data left.");

    let prompt = &harness.generator.prompts().await[0];
    assert_eq!(prompt.message, "what's my balance");
    assert!(prompt.history.is_empty());
    assert!(prompt.system.contains("balance_check"));
}

#[tokio::test]
async fn follow_up_sees_previous_turns_in_history() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["2GB left.".to_string(), "Done.".to_string()])
        .build()
        .await
        .unwrap();

    let first = harness
        .send(Channel::Whatsapp, "wa-42", "check my balance")
        .await
        .unwrap();
    let second = harness
        .send(Channel::Whatsapp, "wa-42", "recharge my account please")
        .await
        .unwrap();
    assert_eq!(first.conversation_id, second.conversation_id);

    let prompts = harness.generator.prompts().await;
    assert_eq!(prompts[1].history.len(), 2);
    assert_eq!(prompts[1].history[0].content, "check my balance");
    assert_eq!(prompts[1].history[1].content, "2GB left.");
}

#[tokio::test]
async fn replies_are_stored_as_the_channel_shaped_them() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["A very long answer about your balance".to_string()])
        .build()
        .await
        .unwrap();
    let sms = switchboard_test_utils::MockChannel::new(Channel::Sms).with_max_length(12);

    let inbound = harness.inbound(Channel::Sms, "+15550102", "balance please");
    let outcome = harness.pipeline.handle(inbound, &sms).await.unwrap();

    assert_eq!(outcome.replies, vec!["A very long "]);
    let conversation = harness.store.get(&outcome.conversation_id).await.unwrap();
    assert_eq!(conversation.messages[1].content, "A very long ");
}

#[tokio::test]
async fn empty_message_is_rejected_before_anything_is_stored() {
    let harness = TestHarness::builder().build().await.unwrap();

    let err = harness
        .send(Channel::Sms, "+15550103", "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::Validation(_)));
    assert!(harness.store.list(None).await.unwrap().is_empty());
    assert_eq!(harness.generator.calls().await, 0);
}

#[tokio::test]
async fn redelivered_message_gets_no_second_reply() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["Your balance is $10.".into(), "unused".into()])
        .build()
        .await
        .unwrap();

    let mut inbound = harness.inbound(Channel::Sms, "+15550104", "my balance?");
    inbound.external_id = Some("SM123".into());
    let first = harness
        .pipeline
        .handle(inbound.clone(), harness.sms.as_ref())
        .await
        .unwrap();
    assert_eq!(first.kind, TurnKind::Replied);

    let again = harness
        .pipeline
        .handle(inbound, harness.sms.as_ref())
        .await
        .unwrap();
    assert_eq!(again.kind, TurnKind::Duplicate);
    assert!(!again.should_respond());
    assert_eq!(again.conversation_id, first.conversation_id);

    let conversation = harness.store.get(&first.conversation_id).await.unwrap();
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[0].external_id.as_deref(), Some("SM123"));
    assert_eq!(harness.generator.calls().await, 1);
    assert_eq!(harness.sms.sent_texts().await.len(), 1);
}

// ---- Escalation ----

#[tokio::test]
async fn asking_for_a_human_hands_off_without_generating() {
    let harness = TestHarness::builder().build().await.unwrap();

    let outcome = harness
        .send(Channel::Sms, "+15550105", "I want to talk to a human")
        .await
        .unwrap();

    assert!(matches!(
        outcome.kind,
        TurnKind::Escalated(EscalationReason::TriggerPhrase(ref p)) if p == "human"
    ));
    assert_eq!(harness.generator.calls().await, 0);
    assert_eq!(
        harness.sms.sent_texts().await,
        vec![harness.config.agent.handoff_message.clone()]
    );

    let conversation = harness.store.get(&outcome.conversation_id).await.unwrap();
    assert_eq!(conversation.status, ConversationStatus::Escalated);
    let notice = conversation.messages.last().unwrap();
    assert_eq!(notice.sender, Sender::System);
    assert_eq!(notice.metadata["handoff"], true);
    assert_eq!(notice.metadata["reason"], "trigger_phrase");

    let queued = harness
        .store
        .escalations(&outcome.conversation_id)
        .await
        .unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].reason, "trigger_phrase");
}

#[tokio::test]
async fn fraud_reports_always_escalate() {
    let harness = TestHarness::builder().build().await.unwrap();

    let outcome = harness
        .send(Channel::Whatsapp, "wa-7", "there is an unauthorized charge, this is fraud")
        .await
        .unwrap();

    assert!(matches!(
        outcome.kind,
        TurnKind::Escalated(EscalationReason::AlwaysEscalate(ref i)) if i == "fraud_report"
    ));
}

#[tokio::test]
async fn unclear_message_escalates_on_low_confidence() {
    let harness = TestHarness::builder().build().await.unwrap();

    let outcome = harness
        .send(Channel::Sms, "+15550106", "blue elephants on tuesday")
        .await
        .unwrap();

    assert!(matches!(
        outcome.kind,
        TurnKind::Escalated(EscalationReason::LowConfidence { .. })
    ));
}

#[tokio::test]
async fn escalated_conversation_waits_for_an_agent() {
    let harness = TestHarness::builder().build().await.unwrap();

    let first = harness
        .send(Channel::Sms, "+15550107", "get me a supervisor")
        .await
        .unwrap();
    let second = harness
        .send(Channel::Sms, "+15550107", "what's my balance")
        .await
        .unwrap();

    assert_eq!(first.conversation_id, second.conversation_id);
    assert_eq!(second.kind, TurnKind::AwaitingAgent);
    assert!(!second.should_respond());
    assert_eq!(harness.sms.sent_texts().await.len(), 1);
    assert_eq!(harness.generator.calls().await, 0);

    let conversation = harness.store.get(&second.conversation_id).await.unwrap();
    assert_eq!(conversation.messages.last().unwrap().content, "what's my balance");
    assert_eq!(
        harness
            .store
            .escalations(&second.conversation_id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn resolved_conversation_is_replaced_by_a_new_one() {
    let harness = TestHarness::builder().build().await.unwrap();

    let first = harness
        .send(Channel::Sms, "+15550108", "my balance")
        .await
        .unwrap();
    harness.store.resolve(&first.conversation_id).await.unwrap();

    let second = harness
        .send(Channel::Sms, "+15550108", "my balance again")
        .await
        .unwrap();
    assert_ne!(first.conversation_id, second.conversation_id);
}

// ---- Generation failures ----

#[tokio::test]
async fn generation_failure_apologizes_then_escalates_at_the_limit() {
    let harness = TestHarness::builder()
        .with_script(vec![
            Scripted::Fail("overloaded".into()),
            Scripted::Fail("overloaded".into()),
            Scripted::Fail("overloaded".into()),
        ])
        .build()
        .await
        .unwrap();
    let apology = harness.config.agent.apology_message.clone();
    let handoff = harness.config.agent.handoff_message.clone();

    for _ in 0..2 {
        let outcome = harness
            .send(Channel::Sms, "+15550109", "my balance")
            .await
            .unwrap();
        assert_eq!(outcome.kind, TurnKind::Apologized);
        assert_eq!(outcome.replies, vec![apology.clone()]);
    }

    let third = harness
        .send(Channel::Sms, "+15550109", "my balance")
        .await
        .unwrap();
    assert_eq!(
        third.kind,
        TurnKind::Escalated(EscalationReason::RepeatedGenerationFailure(3))
    );
    assert_eq!(third.replies, vec![apology.clone(), handoff]);

    let conversation = harness.store.get(&third.conversation_id).await.unwrap();
    assert_eq!(conversation.status, ConversationStatus::Escalated);
    let fallbacks = conversation
        .messages
        .iter()
        .filter(|m| m.metadata["fallback"] == true)
        .count();
    assert_eq!(fallbacks, 3);
}

#[tokio::test]
async fn successful_reply_resets_the_failure_count() {
    let harness = TestHarness::builder()
        .with_script(vec![
            Scripted::Fail("x".into()),
            Scripted::Fail("x".into()),
            Scripted::Text("2GB left".into()),
            Scripted::Fail("x".into()),
        ])
        .build()
        .await
        .unwrap();

    let mut last = None;
    for _ in 0..4 {
        last = Some(
            harness
                .send(Channel::Sms, "+15550110", "my balance")
                .await
                .unwrap(),
        );
    }
    let last = last.unwrap();
    assert_eq!(last.kind, TurnKind::Apologized);
    let conversation = harness.store.get_summary(&last.conversation_id).await.unwrap();
    assert_eq!(conversation.generation_failures, 1);
    assert_eq!(conversation.status, ConversationStatus::Active);
}

#[tokio::test]
async fn generation_timeout_counts_as_failure() {
    let harness = TestHarness::builder()
        .with_script(vec![Scripted::Stall(vec![])])
        .with_timeouts(Duration::from_millis(100), Duration::from_millis(100))
        .build()
        .await
        .unwrap();

    let outcome = harness
        .send(Channel::Sms, "+15550111", "my balance")
        .await
        .unwrap();
    assert_eq!(outcome.kind, TurnKind::Apologized);
}

#[tokio::test]
async fn failed_delivery_surfaces_as_channel_error_after_storing() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.sms.fail_sends(true);

    let err = harness
        .send(Channel::Sms, "+15550112", "my balance")
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::Channel { .. }));

    let conversations = harness.store.list(None).await.unwrap();
    let stored = harness.store.get(&conversations[0].id).await.unwrap();
    assert_eq!(stored.messages.len(), 2);
}

// ---- Streaming ----

#[tokio::test]
async fn streamed_chunks_concatenate_to_the_stored_reply() {
    let harness = TestHarness::builder()
        .with_script(vec![Scripted::Chunks(vec![
            "You have ".into(),
            "".into(),
            "2GB ".into(),
            "left.".into(),
        ])])
        .build()
        .await
        .unwrap();

    let turn = harness.stream("web-1", "what's my balance").await.unwrap();
    let (conversation_id, items) = streaming(turn);
    let items = collect_items(items).await;

    assert_eq!(items.last(), Some(&StreamItem::Done));
    assert!(!items.contains(&StreamItem::Chunk(String::new())));
    assert_eq!(chunk_text(&items), "You have 2GB left.");

    let conversation = harness.store.get(&conversation_id).await.unwrap();
    let reply = conversation.messages.last().unwrap();
    assert_eq!(reply.sender, Sender::Ai);
    assert_eq!(reply.content, "You have 2GB left.");
    assert!(reply.metadata.get("partial").is_none());
}

#[tokio::test]
async fn streaming_escalation_completes_without_a_stream() {
    let harness = TestHarness::builder().build().await.unwrap();

    let turn = harness
        .stream("web-2", "let me speak to a real person")
        .await
        .unwrap();
    match turn {
        StreamingTurn::Complete(outcome) => {
            assert!(matches!(outcome.kind, TurnKind::Escalated(_)));
            assert_eq!(outcome.replies.len(), 1);
        }
        StreamingTurn::Streaming { .. } => panic!("hand-off must not stream"),
    }
    assert_eq!(harness.generator.calls().await, 0);
}

#[tokio::test]
async fn stream_failure_before_first_chunk_streams_the_apology() {
    let harness = TestHarness::builder()
        .with_script(vec![Scripted::FailAfter(vec![], "boom".into())])
        .build()
        .await
        .unwrap();

    let (conversation_id, items) = streaming(harness.stream("web-3", "my balance").await.unwrap());
    let items = collect_items(items).await;
    assert_eq!(chunk_text(&items), harness.config.agent.apology_message);

    let conversation = harness.store.get(&conversation_id).await.unwrap();
    let reply = conversation.messages.last().unwrap();
    assert_eq!(reply.metadata["fallback"], true);
    assert_eq!(conversation.generation_failures, 1);
}

#[tokio::test]
async fn stream_open_failure_completes_with_apology() {
    let harness = TestHarness::builder()
        .with_script(vec![Scripted::Fail("refused".into())])
        .build()
        .await
        .unwrap();

    match harness.stream("web-4", "my balance").await.unwrap() {
        StreamingTurn::Complete(outcome) => assert_eq!(outcome.kind, TurnKind::Apologized),
        StreamingTurn::Streaming { .. } => panic!("stream should not open"),
    }
}

#[tokio::test]
async fn mid_stream_failure_keeps_the_partial_reply() {
    let harness = TestHarness::builder()
        .with_script(vec![Scripted::FailAfter(
            vec!["You have ".into(), "2GB".into()],
            "connection reset".into(),
        )])
        .build()
        .await
        .unwrap();

    let (conversation_id, items) = streaming(harness.stream("web-5", "my balance").await.unwrap());
    let items = collect_items(items).await;
    assert_eq!(chunk_text(&items), "You have 2GB");

    let conversation = harness.store.get(&conversation_id).await.unwrap();
    let reply = conversation.messages.last().unwrap();
    assert_eq!(reply.content, "You have 2GB");
    assert_eq!(reply.metadata["partial"], true);
    assert_eq!(conversation.generation_failures, 1);
}

#[tokio::test]
async fn stalled_stream_times_out_and_keeps_partial_text() {
    let harness = TestHarness::builder()
        .with_script(vec![Scripted::Stall(vec!["Checking".into()])])
        .with_timeouts(Duration::from_secs(5), Duration::from_millis(150))
        .build()
        .await
        .unwrap();

    let (conversation_id, items) = streaming(harness.stream("web-6", "my balance").await.unwrap());
    let items = collect_items(items).await;
    assert_eq!(items.first(), Some(&StreamItem::Chunk("Checking".into())));
    assert_eq!(items.last(), Some(&StreamItem::Done));

    let conversation = harness.store.get(&conversation_id).await.unwrap();
    assert_eq!(conversation.messages.last().unwrap().content, "Checking");
    assert_eq!(harness.generator.open_streams(), 0);
}

#[tokio::test]
async fn cancelling_a_stream_stores_what_was_sent() {
    let harness = TestHarness::builder()
        .with_script(vec![Scripted::Stall(vec!["Hello ".into(), "there".into()])])
        .with_timeouts(Duration::from_secs(30), Duration::from_secs(30))
        .build()
        .await
        .unwrap();
    let cancel = CancellationToken::new();

    let inbound = harness.inbound(Channel::Web, "web-7", "my balance");
    let (conversation_id, mut items) =
        streaming(harness.stream_with(inbound, cancel.clone()).await.unwrap());

    assert_eq!(items.recv().await, Some(StreamItem::Chunk("Hello ".into())));
    assert_eq!(items.recv().await, Some(StreamItem::Chunk("there".into())));
    cancel.cancel();
    assert_eq!(items.recv().await, Some(StreamItem::Done));

    let conversation = harness.store.get(&conversation_id).await.unwrap();
    let reply = conversation.messages.last().unwrap();
    assert_eq!(reply.content, "Hello there");
    assert_eq!(reply.metadata["partial"], true);
    assert_eq!(conversation.generation_failures, 0);
    assert_eq!(harness.generator.open_streams(), 0);
}

#[tokio::test]
async fn dropping_the_consumer_stops_generation() {
    let harness = TestHarness::builder()
        .with_script(vec![Scripted::Stall(vec!["Hel".into(), "lo".into()])])
        .with_timeouts(Duration::from_secs(30), Duration::from_secs(30))
        .build()
        .await
        .unwrap();

    let (conversation_id, mut items) =
        streaming(harness.stream("web-8", "my balance").await.unwrap());
    assert_eq!(items.recv().await, Some(StreamItem::Chunk("Hel".into())));
    drop(items);

    harness.pipeline.streams().close();
    tokio::time::timeout(Duration::from_secs(5), harness.pipeline.streams().wait())
        .await
        .expect("stream task should stop once the consumer is gone");

    assert_eq!(harness.generator.open_streams(), 0);
    let conversation = harness.store.get(&conversation_id).await.unwrap();
    let reply = conversation.messages.last().unwrap();
    assert!(reply.content.starts_with("Hel"));
    assert_eq!(reply.metadata["partial"], true);
}

#[tokio::test]
async fn explicit_conversation_id_continues_the_thread() {
    let harness = TestHarness::builder().build().await.unwrap();

    let (conversation_id, items) = streaming(harness.stream("web-9", "my balance").await.unwrap());
    collect_items(items).await;

    let mut inbound = harness.inbound(Channel::Web, "web-9", "and my data bundle?");
    inbound.conversation_id = Some(conversation_id.clone());
    let (next_id, items) = streaming(
        harness
            .stream_with(inbound, CancellationToken::new())
            .await
            .unwrap(),
    );
    collect_items(items).await;
    assert_eq!(next_id, conversation_id);

    let mut foreign = harness.inbound(Channel::Web, "web-intruder", "my balance");
    foreign.conversation_id = Some(conversation_id);
    let err = harness
        .stream_with(foreign, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::Validation(_)));

    let mut missing = harness.inbound(Channel::Web, "web-9", "my balance");
    missing.conversation_id = Some("does-not-exist".into());
    let err = harness
        .stream_with(missing, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SwitchboardError::NotFound { .. }));
}

// ---- Concurrency ----

#[tokio::test]
async fn concurrent_messages_share_one_conversation_with_ordered_log() {
    let harness = Arc::new(TestHarness::builder().build().await.unwrap());

    let mut tasks = Vec::new();
    for i in 0..10 {
        let harness = harness.clone();
        tasks.push(tokio::spawn(async move {
            harness
                .send(Channel::Sms, "+15550199", &format!("balance check {i}"))
                .await
                .unwrap()
                .conversation_id
        }));
    }
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let conversation = harness.store.get(&ids[0]).await.unwrap();
    assert_eq!(conversation.messages.len(), 20);
    let seqs: Vec<i64> = conversation.messages.iter().map(|m| m.seq).collect();
    assert_eq!(seqs, (1..=20).collect::<Vec<_>>());
    assert!(
        conversation
            .messages
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp)
    );
}
