use push_service::config::FcmConfig;
use push_service::services::providers::TokenSource;
use push_service::services::{BatchDispatcher, FcmProvider, ServiceAccount};
use secrecy::Secret;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

const TEST_KEY: &str = include_str!("fixtures/service-account-key.pem");

/// A token endpoint that accepts connections and never answers.
/// Returns its URL and a count of accepted connections.
async fn stalled_token_endpoint() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind listener");
    let address = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&accepted);
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(stream);
        }
    });

    (format!("http://{}/token", address), accepted)
}

fn account(token_uri: String) -> ServiceAccount {
    ServiceAccount {
        project_id: "demo-project".to_string(),
        client_email: "relay@demo-project.iam.gserviceaccount.com".to_string(),
        private_key: Secret::new(TEST_KEY.to_string()),
        private_key_id: Some("key-1".to_string()),
        token_uri,
    }
}

fn short_timeout_config() -> FcmConfig {
    FcmConfig {
        api_url: "http://127.0.0.1:1".to_string(),
        request_timeout_secs: 1,
        ..FcmConfig::default()
    }
}

#[tokio::test]
async fn stalled_token_endpoint_costs_a_batch_one_timeout() {
    let (token_uri, accepted) = stalled_token_endpoint().await;
    let provider = FcmProvider::new(account(token_uri), &short_timeout_config())
        .expect("Failed to build provider");
    let dispatcher = BatchDispatcher::new(Arc::new(provider));

    let started = Instant::now();
    let report = dispatcher
        .dispatch(&["t".to_string()], 6, serde_json::Map::new())
        .await
        .expect("Batch should complete");
    let elapsed = started.elapsed();

    assert_eq!(report.failure_count, 6);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.error.as_ref().unwrap().code == "app/network-error"));
    assert!(
        elapsed < Duration::from_secs(3),
        "batch took {:?}",
        elapsed
    );
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_refresh_is_retried_by_the_next_caller() {
    let (token_uri, accepted) = stalled_token_endpoint().await;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let tokens = TokenSource::new(account(token_uri), client).expect("Failed to parse key");

    assert!(tokens.access_token().await.is_err());
    assert!(tokens.access_token().await.is_err());

    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}
