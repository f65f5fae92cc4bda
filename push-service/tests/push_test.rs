mod common;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{post_push, router, send};
use push_service::services::{MockPushProvider, ProviderError, PushMessage, PushProvider};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Fails exactly one call, chosen by its 1-based position.
struct FailOnce {
    calls: AtomicUsize,
    fail_on: usize,
}

#[async_trait]
impl PushProvider for FailOnce {
    async fn send(&self, _push: &PushMessage) -> Result<String, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(ProviderError::Rejected {
                code: "messaging/registration-token-not-registered".to_string(),
                message: "Requested entity was not found.".to_string(),
            });
        }
        Ok(format!("projects/test/messages/{}", call))
    }

    fn name(&self) -> &'static str {
        "fail-once"
    }
}

/// Records every body it is asked to send.
#[derive(Default)]
struct Recording {
    sent: Mutex<Vec<PushMessage>>,
}

#[async_trait]
impl PushProvider for Recording {
    async fn send(&self, push: &PushMessage) -> Result<String, ProviderError> {
        self.sent.lock().unwrap().push(push.clone());
        Ok("projects/test/messages/recorded".to_string())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn mock() -> Option<Arc<dyn PushProvider>> {
    Some(Arc::new(MockPushProvider::new()))
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn missing_tokens_returns_400() {
    let (status, body) = post_push(router(mock()), json!({})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("required"));
}

#[tokio::test]
async fn non_array_tokens_returns_400() {
    let (status, body) = post_push(router(mock()), json!({ "tokens": "abc" })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("must be an array"));
}

#[tokio::test]
async fn empty_tokens_returns_400() {
    let (status, body) = post_push(router(mock()), json!({ "tokens": [] })).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn falsy_tokens_read_as_missing() {
    for tokens in [json!(""), json!(0), json!(false)] {
        let (status, body) = post_push(router(mock()), json!({ "tokens": tokens })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "tokens array is required.");
    }
}

#[tokio::test]
async fn non_object_json_body_reads_as_missing_tokens() {
    for payload in [json!([]), json!(["t1"]), json!("x")] {
        let (status, body) = post_push(router(mock()), payload).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "tokens array is required.");
    }
}

#[tokio::test]
async fn malformed_json_returns_400() {
    let (status, body) = send(
        router(mock()),
        Request::builder()
            .method("POST")
            .uri("/push")
            .header("content-type", "application/json")
            .body(Body::from("{\"tokens\": ["))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn missing_content_type_reads_as_missing_tokens() {
    let (status, body) = send(
        router(mock()),
        Request::builder()
            .method("POST")
            .uri("/push")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("required"));
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn sends_requested_number_of_messages_per_token() {
    let provider = Arc::new(MockPushProvider::new());
    let (status, body) = post_push(
        router(Some(provider.clone())),
        json!({ "tokens": ["t1", "t2"], "messagesPerToken": 3 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"]["totalTokens"], 2);
    assert_eq!(body["summary"]["messagesPerToken"], 3);
    assert_eq!(body["summary"]["totalMessages"], 6);
    assert_eq!(body["summary"]["successCount"], 6);
    assert_eq!(body["summary"]["failureCount"], 0);
    assert_eq!(body["results"].as_array().unwrap().len(), 6);
    assert!(body["sentAt"].as_str().unwrap().ends_with('Z'));
    assert_eq!(provider.send_count(), 6);

    let order: Vec<(String, u64)> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| {
            (
                r["token"].as_str().unwrap().to_string(),
                r["messageIndex"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        order,
        vec![
            ("t1".to_string(), 1),
            ("t1".to_string(), 2),
            ("t1".to_string(), 3),
            ("t2".to_string(), 1),
            ("t2".to_string(), 2),
            ("t2".to_string(), 3),
        ]
    );
}

#[tokio::test]
async fn invalid_messages_per_token_uses_default_of_ten() {
    for value in [json!(0), json!(-1), json!(101), json!("abc")] {
        let (status, body) = post_push(
            router(mock()),
            json!({ "tokens": ["t1"], "messagesPerToken": value }),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "value {}", value);
        assert_eq!(body["summary"]["messagesPerToken"], 10);
        assert_eq!(body["summary"]["totalMessages"], 10);
    }
}

#[tokio::test]
async fn single_failure_is_reported_per_outcome() {
    let provider = Arc::new(FailOnce {
        calls: AtomicUsize::new(0),
        fail_on: 2,
    });
    let (status, body) = post_push(
        router(Some(provider)),
        json!({ "tokens": ["t1", "t2"], "messagesPerToken": 3 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["summary"]["totalMessages"], 6);
    assert_eq!(body["summary"]["successCount"], 5);
    assert_eq!(body["summary"]["failureCount"], 1);

    let failures: Vec<_> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["success"] == false)
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(failures[0]["messageId"].is_null());
    assert_eq!(
        failures[0]["error"]["code"],
        "messaging/registration-token-not-registered"
    );
}

#[tokio::test]
async fn message_override_replaces_top_level_keys_only() {
    let provider = Arc::new(Recording::default());
    let (status, _) = post_push(
        router(Some(provider.clone())),
        json!({
            "tokens": ["t1"],
            "messagesPerToken": 1,
            "message": { "notification": { "title": "X" }, "tokens": ["ignored"] },
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);

    let sent = provider.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let body = &sent[0].body;
    assert_eq!(body["notification"], json!({ "title": "X" }));
    assert!(body.get("tokens").is_none());
    assert_eq!(body["android"]["priority"], "high");
    assert_eq!(sent[0].token, "t1");
}

#[tokio::test]
async fn malformed_message_override_fails_whole_batch() {
    let provider = Arc::new(MockPushProvider::new());
    let (status, body) = post_push(
        router(Some(provider.clone())),
        json!({
            "tokens": ["t1"],
            "messagesPerToken": 2,
            "message": { "data": { "k": 1 }, "notification": "not-an-object" },
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "messaging/invalid-payload");
    assert!(body["error"].is_string());
    assert!(body.get("results").is_none());
    assert!(body.get("summary").is_none());
    assert_eq!(provider.send_count(), 0);
}

#[tokio::test]
async fn non_string_data_override_is_invalid_payload() {
    let (status, body) = post_push(
        router(mock()),
        json!({ "tokens": ["t1"], "message": { "data": { "k": 1 } } }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "messaging/invalid-payload");
    assert_eq!(body["error"], "data must only contain string values");
}

#[tokio::test]
async fn default_template_used_without_override() {
    let provider = Arc::new(Recording::default());
    let (status, _) = post_push(
        router(Some(provider.clone())),
        json!({ "tokens": ["t1"], "messagesPerToken": 1 }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let sent = provider.sent.lock().unwrap();
    assert_eq!(sent[0].body["notification"]["body"], "This is a push message test.");
}

// =============================================================================
// Provider not initialized
// =============================================================================

#[tokio::test]
async fn uninitialized_provider_returns_500_for_any_body() {
    for body in [
        json!({ "tokens": ["t1"] }),
        json!({}),
        json!({ "tokens": [] }),
    ] {
        let (status, response) = post_push(router(None), body).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response["success"], false);
        assert!(response["error"].as_str().unwrap().contains("not initialized"));
    }
}

#[tokio::test]
async fn uninitialized_provider_wins_over_malformed_json() {
    let (status, body) = send(
        router(None),
        Request::builder()
            .method("POST")
            .uri("/push")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}
