// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router-level tests for the web chat stream and the dashboard API.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use switchboard_core::types::{ConversationStatus, Sender};
use switchboard_gateway::{GatewayState, HealthState, build_router};
use switchboard_test_utils::{Scripted, TestHarness};
use tower::ServiceExt;

async fn harness(script: Vec<Scripted>) -> TestHarness {
    TestHarness::builder()
        .with_script(script)
        .build()
        .await
        .unwrap()
}

fn router(harness: &TestHarness, metrics: Option<&'static str>) -> Router {
    let render = metrics
        .map(|text| Arc::new(move || text.to_string()) as Arc<dyn Fn() -> String + Send + Sync>);
    let state = GatewayState {
        pipeline: harness.pipeline.clone(),
        default_company_id: Some("acme".into()),
        health: HealthState::new(render),
    };
    build_router(state, None, None)
}

fn chat(body: Value) -> Request<Body> {
    Request::post("/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Parses `data:` frames out of an SSE body, skipping keep-alive comments.
fn frames(body: &str) -> Vec<Value> {
    body.split("\n\n")
        .filter_map(|event| {
            event
                .lines()
                .find_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
        })
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

fn chat_body(customer: &str, message: &str) -> Value {
    json!({"customerId": customer, "message": message, "industry": "mobile"})
}

#[tokio::test]
async fn chat_streams_chunks_then_done() {
    let h = harness(vec![Scripted::Chunks(vec![
        "You have ".into(),
        "2GB ".into(),
        "left.".into(),
    ])])
    .await;
    let app = router(&h, None);

    let response = app
        .oneshot(chat(chat_body("cust-1", "what is my data balance")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let frames = frames(&body_text(response).await);
    let (last, chunks) = frames.split_last().unwrap();
    assert_eq!(last, &json!({"content": "", "done": true}));
    assert!(chunks.iter().all(|f| f["done"] == false));
    let streamed: String = chunks
        .iter()
        .map(|f| f["content"].as_str().unwrap())
        .collect();
    assert_eq!(streamed, "You have 2GB left.");

    let conversations = h.store.list(None).await.unwrap();
    let stored = h.store.get(&conversations[0].id).await.unwrap();
    let reply = stored.messages.last().unwrap();
    assert_eq!(reply.sender, Sender::Ai);
    assert_eq!(reply.content, streamed);
    assert_eq!(stored.company_id.as_deref(), Some("acme"));
}

#[tokio::test]
async fn chat_escalation_is_a_single_done_frame() {
    let h = harness(vec![]).await;
    let app = router(&h, None);

    let response = app
        .oneshot(chat(chat_body("cust-2", "please let me talk to a human")))
        .await
        .unwrap();
    let frames = frames(&body_text(response).await);

    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["done"], true);
    assert_eq!(
        frames[0]["content"],
        h.config.agent.handoff_message.as_str()
    );
    assert_eq!(h.generator.calls().await, 0);
}

#[tokio::test]
async fn chat_on_escalated_conversation_sends_empty_done() {
    let h = harness(vec![]).await;
    let app = router(&h, None);

    app.clone()
        .oneshot(chat(chat_body("cust-3", "I need a supervisor")))
        .await
        .unwrap();
    let response = app
        .oneshot(chat(chat_body("cust-3", "are you there?")))
        .await
        .unwrap();

    assert_eq!(
        frames(&body_text(response).await),
        vec![json!({"content": "", "done": true})]
    );
    let escalated = h
        .store
        .list(Some(ConversationStatus::Escalated))
        .await
        .unwrap();
    assert_eq!(escalated.len(), 1);
    assert_eq!(escalated[0].message_count, 3);
}

#[tokio::test]
async fn chat_rejects_malformed_requests() {
    let h = harness(vec![]).await;
    let app = router(&h, None);

    for body in [
        json!({"customerId": "c", "message": "hi", "industry": "retail"}),
        json!({"message": "hi", "industry": "mobile"}),
        json!({"customerId": " ", "message": "hi", "industry": "mobile"}),
        json!({"customerId": "c", "message": "   ", "industry": "mobile"}),
    ] {
        let response = app.clone().oneshot(chat(body.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        assert!(body_json(response).await["error"].is_string());
    }
    assert!(h.store.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn chat_with_unknown_conversation_is_not_found() {
    let h = harness(vec![]).await;
    let app = router(&h, None);

    let mut body = chat_body("cust-4", "what is my data balance");
    body["conversationId"] = json!("does-not-exist");
    let response = app.oneshot(chat(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(h.store.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn health_reports_ok_and_metrics_follow_config() {
    let h = harness(vec![]).await;

    let response = router(&h, None).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));

    let response = router(&h, None).oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router(&h, Some("switchboard_messages_total 1\n"))
        .oneshot(get("/metrics"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("switchboard_messages_total"));
}

#[tokio::test]
async fn conversations_can_be_listed_and_read() {
    let h = harness(vec![Scripted::Text("You have 2GB left.".into())]).await;
    let app = router(&h, None);

    let streamed = app
        .clone()
        .oneshot(chat(chat_body("cust-5", "what is my data balance")))
        .await
        .unwrap();
    body_text(streamed).await;
    app.clone()
        .oneshot(chat(chat_body("cust-6", "talk to an agent")))
        .await
        .unwrap();

    let all = body_json(app.clone().oneshot(get("/conversations")).await.unwrap()).await;
    assert_eq!(all["conversations"].as_array().unwrap().len(), 2);

    let escalated = body_json(
        app.clone()
            .oneshot(get("/conversations?status=escalated"))
            .await
            .unwrap(),
    )
    .await;
    let escalated = escalated["conversations"].as_array().unwrap();
    assert_eq!(escalated.len(), 1);
    assert_eq!(escalated[0]["customer_id"], "cust-6");

    let response = app
        .clone()
        .oneshot(get("/conversations?status=closed"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let id = escalated[0]["id"].as_str().unwrap().to_string();
    let detail = body_json(
        app.clone()
            .oneshot(get(&format!("/conversations/{id}")))
            .await
            .unwrap(),
    )
    .await;
    let senders: Vec<&str> = detail["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["sender"].as_str().unwrap())
        .collect();
    assert_eq!(senders, ["customer", "system"]);

    let response = app.oneshot(get("/conversations/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn agent_actions_and_resolution() {
    let h = harness(vec![]).await;
    let app = router(&h, None);
    app.clone()
        .oneshot(chat(chat_body("cust-7", "get me a manager")))
        .await
        .unwrap();
    let id = h.store.list(None).await.unwrap()[0].id.clone();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/conversations/{id}/assign"),
            json!({"agent": "dana"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["assigned_agent"], "dana");

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/conversations/{id}/messages"),
            json!({"agent": "dana", "content": "Hi, Dana here."}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["sender"], "agent");

    let response = app
        .clone()
        .oneshot(post_json(&format!("/conversations/{id}/resolve"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "resolved");

    let response = app
        .oneshot(post_json(&format!("/conversations/{id}/resolve"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn escalation_queue_is_served_to_dispatchers() {
    let h = harness(vec![]).await;
    let app = router(&h, None);

    let response = app
        .clone()
        .oneshot(Request::post("/escalations/next").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    app.clone()
        .oneshot(chat(chat_body("cust-8", "I want to speak to a real person")))
        .await
        .unwrap();
    let id = h.store.list(None).await.unwrap()[0].id.clone();

    let response = app
        .clone()
        .oneshot(Request::post("/escalations/next").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let entry = body_json(response).await;
    assert_eq!(entry["conversation_id"], id.as_str());
    assert_eq!(entry["reason"], "trigger_phrase");

    let response = app
        .clone()
        .oneshot(
            Request::post(format!("/escalations/{}/ack", entry["id"]))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let history = body_json(
        app.clone()
            .oneshot(get(&format!("/conversations/{id}/escalations")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["status"], "completed");
}
