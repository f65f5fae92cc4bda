pub mod credentials;
pub mod push;
pub mod wire;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{MessageBody, OutcomeError};

pub use credentials::{ServiceAccount, TokenSource};
pub use push::{FcmProvider, MockPushProvider};

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    /// FCM answered and refused the message.
    #[error("{message}")]
    Rejected { code: String, message: String },
}

impl ProviderError {
    /// Firebase-style error code, e.g. `messaging/invalid-argument`.
    pub fn code(&self) -> &str {
        match self {
            ProviderError::Configuration(_) => "app/invalid-credential",
            ProviderError::Connection(_) => "app/network-error",
            ProviderError::Authentication(_) => "messaging/authentication-error",
            ProviderError::Rejected { code, .. } => code,
        }
    }
}

impl From<&ProviderError> for OutcomeError {
    fn from(err: &ProviderError) -> Self {
        OutcomeError {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// One outbound message: a shared body addressed to a single token.
#[derive(Debug, Clone)]
pub struct PushMessage {
    pub token: String,
    pub body: Arc<MessageBody>,
}

#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Send one message and return the provider-issued message id.
    async fn send(&self, push: &PushMessage) -> Result<String, ProviderError>;

    fn name(&self) -> &'static str;
}
