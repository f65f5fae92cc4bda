#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use push_service::config::{FcmConfig, PushConfig};
use push_service::services::PushProvider;
use push_service::startup::{build_router, AppState, Application};
use serde_json::Value;
use service_core::config::Config as CoreConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;

pub fn static_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("public")
}

pub fn test_config() -> PushConfig {
    PushConfig {
        // Use random port for testing (port 0)
        common: CoreConfig { port: 0 },
        fcm: FcmConfig::default(),
        static_dir: static_dir(),
        log_level: "info".to_string(),
        otlp_endpoint: None,
    }
}

/// Router backed by `provider`, or an uninitialized one when `None`.
pub fn router(provider: Option<Arc<dyn PushProvider>>) -> Router {
    build_router(AppState::new(provider), &static_dir())
}

pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("Failed to execute request");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
    send(
        router,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

pub async fn post_push(router: Router, body: Value) -> (StatusCode, Value) {
    send(
        router,
        Request::builder()
            .method("POST")
            .uri("/push")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    pub async fn spawn(provider: Option<Arc<dyn PushProvider>>) -> Self {
        let app = Application::build_with_provider(test_config(), provider)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address, port }
    }
}
