// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SMS webhook routes.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use switchboard_agent::ConfigDirectory;
use switchboard_core::types::{Industry, Sender, SmsCredentials, Tenant};
use switchboard_sms::signature::compute_signature;
use switchboard_sms::{SmsSettings, SmsState, TwilioClient, sms_router};
use switchboard_test_utils::{Scripted, TestHarness};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WEBHOOK_URL: &str = "https://support.example.com/webhooks/sms";

struct Fixture {
    harness: TestHarness,
    twilio: MockServer,
    router: Router,
}

fn tenant() -> Tenant {
    Tenant {
        company_id: "acme".into(),
        industry: Industry::Mobile,
        sms: Some(SmsCredentials {
            account_sid: "AC1".into(),
            auth_token: "twilio-secret".into(),
            from_number: "+15550001".into(),
        }),
        whatsapp: None,
    }
}

async fn fixture(script: Vec<Scripted>, validate_signatures: bool) -> Fixture {
    let harness = TestHarness::builder()
        .with_script(script)
        .build()
        .await
        .unwrap();
    let twilio = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2010-04-01/Accounts/AC1/Messages.json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"sid": "SM1"})))
        .mount(&twilio)
        .await;

    let state = SmsState {
        pipeline: harness.pipeline.clone(),
        directory: Arc::new(ConfigDirectory::new(vec![tenant()])),
        client: TwilioClient::new(&twilio.uri(), Duration::from_secs(5)).unwrap(),
        settings: SmsSettings {
            validate_signatures,
            webhook_url: Some(WEBHOOK_URL.into()),
            ..SmsSettings::default()
        },
    };
    Fixture {
        harness,
        twilio,
        router: sms_router(state),
    }
}

fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn form_request(params: &BTreeMap<String, String>, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::post("/webhooks/sms")
        .header("content-type", "application/x-www-form-urlencoded");
    if let Some(signature) = signature {
        builder = builder.header("x-twilio-signature", signature);
    }
    builder
        .body(Body::from(serde_urlencoded::to_string(params).unwrap()))
        .unwrap()
}

async fn sent_bodies(twilio: &MockServer) -> Vec<String> {
    twilio
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| {
            let form: BTreeMap<String, String> = serde_urlencoded::from_bytes(&r.body).unwrap();
            form["Body"].clone()
        })
        .collect()
}

#[tokio::test]
async fn long_reply_is_truncated_before_sending_and_storing() {
    let reply = "x".repeat(310);
    let f = fixture(vec![Scripted::Text(reply)], false).await;

    let request = form_request(
        &params(&[
            ("From", "+15550101"),
            ("To", "+15550001"),
            ("Body", "what's my balance"),
            ("MessageSid", "SM-in-1"),
        ]),
        None,
    );
    let response = f.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sent = sent_bodies(&f.twilio).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].chars().count() <= 300);
    assert!(sent[0].ends_with("..."));

    let conversations = f.harness.store.list(None).await.unwrap();
    assert_eq!(conversations.len(), 1);
    let stored = f.harness.store.get(&conversations[0].id).await.unwrap();
    let ai = stored.messages.last().unwrap();
    assert_eq!(ai.sender, Sender::Ai);
    assert_eq!(ai.content, sent[0]);
    assert_eq!(stored.messages[0].external_id.as_deref(), Some("SM-in-1"));
}

#[tokio::test]
async fn same_number_continues_one_conversation() {
    let f = fixture(vec![], false).await;

    for text in ["my balance", "my data bundle"] {
        let request = form_request(&params(&[("From", "+15550101"), ("Body", text)]), None);
        let response = f.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let conversations = f.harness.store.list(None).await.unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].company_id.as_deref(), Some("acme"));
}

#[tokio::test]
async fn formatted_sender_number_continues_one_conversation() {
    let f = fixture(vec![], false).await;

    for from in ["+15550101", "+1 555-0101"] {
        let request = form_request(&params(&[("From", from), ("Body", "my balance")]), None);
        let response = f.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let conversations = f.harness.store.list(None).await.unwrap();
    assert_eq!(conversations.len(), 1);
    let stored = f.harness.store.get(&conversations[0].id).await.unwrap();
    let from_customer = stored
        .messages
        .iter()
        .filter(|m| m.sender == Sender::Customer)
        .count();
    assert_eq!(from_customer, 2);
}

#[tokio::test]
async fn handoff_sms_is_sent_without_generation() {
    let f = fixture(vec![], false).await;

    let request = form_request(
        &params(&[("From", "+15550102"), ("Body", "I need to talk to a human")]),
        None,
    );
    let response = f.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(f.harness.generator.calls().await, 0);
    assert_eq!(
        sent_bodies(&f.twilio).await,
        vec![f.harness.config.agent.handoff_message.clone()]
    );
}

#[tokio::test]
async fn malformed_payload_is_rejected_without_a_conversation() {
    let f = fixture(vec![], false).await;

    let request = form_request(&params(&[("From", "+15550103")]), None);
    let response = f.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(f.harness.store.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_receiving_number_is_not_found() {
    let f = fixture(vec![], false).await;

    let request = form_request(
        &params(&[("From", "+15550104"), ("To", "+19999999"), ("Body", "balance")]),
        None,
    );
    let response = f.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(sent_bodies(&f.twilio).await.is_empty());
}

#[tokio::test]
async fn signature_is_enforced_when_enabled() {
    let f = fixture(vec![], true).await;
    let form = params(&[("From", "+15550105"), ("To", "+15550001"), ("Body", "balance")]);

    let response = f
        .router
        .clone()
        .oneshot(form_request(&form, Some("bm90LXRoZS1zaWduYXR1cmU=")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(f.harness.store.list(None).await.unwrap().is_empty());

    let signature = compute_signature("twilio-secret", WEBHOOK_URL, &form);
    let response = f
        .router
        .clone()
        .oneshot(form_request(&form, Some(&signature)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn get_reports_liveness() {
    let f = fixture(vec![], false).await;
    let response = f
        .router
        .clone()
        .oneshot(Request::get("/webhooks/sms").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"SMS webhook is live");
}

#[tokio::test]
async fn redelivered_message_sid_is_answered_once() {
    let f = fixture(
        vec![
            Scripted::Text("Your balance is $10.".into()),
            Scripted::Text("unused".into()),
        ],
        false,
    )
    .await;

    let form = params(&[
        ("From", "+15550101"),
        ("To", "+15550001"),
        ("Body", "what's my balance"),
        ("MessageSid", "SM-retry"),
    ]);
    for _ in 0..2 {
        let response = f
            .router
            .clone()
            .oneshot(form_request(&form, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(sent_bodies(&f.twilio).await, vec!["Your balance is $10.".to_string()]);
    assert_eq!(f.harness.generator.calls().await, 1);
    let conversations = f.harness.store.list(None).await.unwrap();
    let stored = f.harness.store.get(&conversations[0].id).await.unwrap();
    assert_eq!(stored.messages.len(), 2);
}
