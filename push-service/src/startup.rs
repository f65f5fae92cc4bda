//! Application startup and lifecycle management.

use crate::config::PushConfig;
use crate::handlers::{health_check, message_template, metrics_endpoint, send_push};
use crate::models::{default_template, MessageBody};
use crate::services::{initialize, BatchDispatcher, PushProvider};
use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// `None` until a push provider has been initialized.
    pub dispatcher: Option<BatchDispatcher>,
    pub template: Arc<MessageBody>,
}

impl AppState {
    pub fn new(provider: Option<Arc<dyn PushProvider>>) -> Self {
        Self {
            dispatcher: provider.map(BatchDispatcher::new),
            template: Arc::new(default_template(Utc::now())),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.dispatcher.is_some()
    }
}

pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/message-template", get(message_template))
        .route("/push", post(send_push))
        .route("/metrics", get(metrics_endpoint))
        .fallback_service(ServeDir::new(static_dir))
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Initialize the push provider and bind the HTTP listener.
    pub async fn build(config: PushConfig) -> Result<Self, AppError> {
        let provider = initialize(&config.fcm);
        Self::build_with_provider(config, provider).await
    }

    /// Like [`Application::build`] but with an already constructed provider.
    pub async fn build_with_provider(
        config: PushConfig,
        provider: Option<Arc<dyn PushProvider>>,
    ) -> Result<Self, AppError> {
        let state = AppState::new(provider);

        // Port 0 picks a random port, used by tests.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            port,
            fcm_initialized = state.is_ready(),
            "Push service listening"
        );

        Ok(Self {
            port,
            listener,
            router: build_router(state, &config.static_dir),
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
