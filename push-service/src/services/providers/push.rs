use super::credentials::{ServiceAccount, TokenSource};
use super::wire::{decode_error, encode_message, SendResponse};
use super::{ProviderError, PushMessage, PushProvider};
use crate::config::FcmConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Sends through the FCM HTTP v1 API using service-account credentials.
pub struct FcmProvider {
    tokens: TokenSource,
    client: Client,
    send_url: String,
}

impl FcmProvider {
    pub fn new(account: ServiceAccount, config: &FcmConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        let send_url = format!(
            "{}/v1/projects/{}/messages:send",
            config.api_url.trim_end_matches('/'),
            account.project_id
        );

        let tokens = TokenSource::new(account, client.clone())?;

        Ok(Self {
            tokens,
            client,
            send_url,
        })
    }

    pub fn project_id(&self) -> &str {
        self.tokens.project_id()
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send(&self, push: &PushMessage) -> Result<String, ProviderError> {
        let access_token = self.tokens.access_token().await?;

        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(&access_token)
            .json(&encode_message(push))
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("Failed to connect to FCM: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(decode_error(status.as_u16(), &body));
        }

        let sent: SendResponse = response.json().await.map_err(|e| ProviderError::Rejected {
            code: "messaging/internal-error".to_string(),
            message: format!("Failed to parse FCM response: {}", e),
        })?;

        tracing::debug!(
            token = %push.token,
            message_id = %sent.name,
            "Push notification sent via FCM"
        );

        Ok(sent.name)
    }

    fn name(&self) -> &'static str {
        "fcm"
    }
}

/// In-process provider for local development and tests. Every send succeeds
/// unless its token was registered with [`MockPushProvider::failing_for`].
#[derive(Default)]
pub struct MockPushProvider {
    send_count: AtomicU64,
    failing_tokens: HashSet<String>,
}

impl MockPushProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            send_count: AtomicU64::new(0),
            failing_tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushProvider for MockPushProvider {
    async fn send(&self, push: &PushMessage) -> Result<String, ProviderError> {
        let n = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;

        if self.failing_tokens.contains(&push.token) {
            return Err(ProviderError::Rejected {
                code: "messaging/registration-token-not-registered".to_string(),
                message: "Requested entity was not found.".to_string(),
            });
        }

        tracing::info!(token = %push.token, "[MOCK] Push notification would be sent");

        Ok(format!("projects/mock/messages/mock-push-{}", n))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
