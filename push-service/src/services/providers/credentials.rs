//! Service-account credentials and the OAuth2 access tokens minted from them.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OnceCell};

use super::ProviderError;
use crate::config::CredentialSource;

pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are replaced before use.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

/// The subset of a Google service-account key file this service needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: Secret<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccount {
    pub fn load(source: &CredentialSource) -> Result<Self, ProviderError> {
        let account = match source {
            CredentialSource::File(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    ProviderError::Configuration(format!(
                        "Failed to read service account file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::from_json(&raw)?
            }
            CredentialSource::Json(raw) => Self::from_json(raw.expose_secret())?,
            CredentialSource::Fields {
                project_id,
                client_email,
                private_key,
            } => Self {
                project_id: project_id.clone(),
                client_email: client_email.clone(),
                // Keys pasted into a single env line carry literal `\n`.
                private_key: Secret::new(private_key.expose_secret().replace("\\n", "\n")),
                private_key_id: None,
                token_uri: default_token_uri(),
            },
        };

        account.validate()?;
        Ok(account)
    }

    fn from_json(raw: &str) -> Result<Self, ProviderError> {
        serde_json::from_str(raw).map_err(|e| {
            ProviderError::Configuration(format!("Invalid service account JSON: {}", e))
        })
    }

    fn validate(&self) -> Result<(), ProviderError> {
        if self.project_id.is_empty() {
            return Err(ProviderError::Configuration(
                "Service account project_id is empty".to_string(),
            ));
        }
        if self.client_email.is_empty() {
            return Err(ProviderError::Configuration(
                "Service account client_email is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// One refresh attempt. Every caller that joins it gets the same result,
/// success or failure.
type Refresh = Arc<OnceCell<Result<AccessToken, ProviderError>>>;

/// Exchanges signed JWT assertions for access tokens and caches the result.
pub struct TokenSource {
    account: ServiceAccount,
    key: EncodingKey,
    client: Client,
    current: Mutex<Refresh>,
}

impl TokenSource {
    pub fn new(account: ServiceAccount, client: Client) -> Result<Self, ProviderError> {
        let key = EncodingKey::from_rsa_pem(account.private_key.expose_secret().as_bytes())
            .map_err(|e| {
                ProviderError::Configuration(format!(
                    "Failed to parse service account private key: {}",
                    e
                ))
            })?;

        Ok(Self {
            account,
            key,
            client,
            current: Mutex::new(Refresh::default()),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.account.project_id
    }

    /// Return a valid access token. A failed or nearly expired refresh is
    /// replaced by a new one.
    ///
    /// Callers that arrive while a fetch is in flight join it instead of
    /// starting their own, so a stalled token endpoint costs a batch one
    /// request timeout rather than one per send.
    pub async fn access_token(&self) -> Result<String, ProviderError> {
        let refresh = {
            let mut current = self.current.lock().await;
            let stale = match current.get() {
                None => false,
                Some(Ok(token)) => token.expires_at <= Instant::now() + REFRESH_MARGIN,
                Some(Err(_)) => true,
            };
            if stale {
                *current = Refresh::default();
            }
            Arc::clone(&current)
        };

        match refresh.get_or_init(|| self.fetch()).await {
            Ok(token) => Ok(token.value.clone()),
            Err(e) => Err(e.clone()),
        }
    }

    fn assertion(&self) -> Result<String, ProviderError> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: FCM_SCOPE,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.account.private_key_id.clone();

        encode(&header, &claims, &self.key).map_err(|e| {
            ProviderError::Authentication(format!("Failed to sign token assertion: {}", e))
        })
    }

    async fn fetch(&self) -> Result<AccessToken, ProviderError> {
        let assertion = self.assertion()?;

        let response = self
            .client
            .post(&self.account.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| {
                ProviderError::Connection(format!("Failed to reach token endpoint: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            ProviderError::Authentication(format!("Failed to parse token response: {}", e))
        })?;

        tracing::debug!(expires_in = token.expires_in, "Fetched FCM access token");

        Ok(AccessToken {
            value: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}
