use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;

pub const DEFAULT_FCM_API_URL: &str = "https://fcm.googleapis.com";

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub common: core_config::Config,
    pub fcm: FcmConfig,
    /// Directory served for `/` and any unmatched path.
    pub static_dir: PathBuf,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FcmConfig {
    /// `None` leaves the provider uninitialized; the server still starts.
    pub credentials: Option<CredentialSource>,
    pub api_url: String,
    pub request_timeout_secs: u64,
    /// Swap in the in-process mock provider for local development.
    pub mock: bool,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            api_url: DEFAULT_FCM_API_URL.to_string(),
            request_timeout_secs: 30,
            mock: false,
        }
    }
}

/// Where the Firebase service-account credential comes from.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Path to a service-account JSON key file.
    File(PathBuf),
    /// Service-account JSON supplied inline.
    Json(Secret<String>),
    /// The three required fields supplied separately.
    Fields {
        project_id: String,
        client_email: String,
        private_key: Secret<String>,
    },
}

impl CredentialSource {
    /// Pick the first configured source, in order: key file path, inline JSON,
    /// individual fields. Empty values count as unset.
    pub fn resolve<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(path) = var("FIREBASE_SERVICE_ACCOUNT_PATH") {
            return Some(CredentialSource::File(PathBuf::from(path)));
        }

        if let Some(json) = var("FIREBASE_SERVICE_ACCOUNT") {
            return Some(CredentialSource::Json(Secret::new(json)));
        }

        match (
            var("FIREBASE_PROJECT_ID"),
            var("FIREBASE_PRIVATE_KEY"),
            var("FIREBASE_CLIENT_EMAIL"),
        ) {
            (Some(project_id), Some(private_key), Some(client_email)) => {
                Some(CredentialSource::Fields {
                    project_id,
                    client_email,
                    private_key: Secret::new(private_key),
                })
            }
            _ => None,
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            CredentialSource::File(_) => "JSON file path",
            CredentialSource::Json(_) => "environment variable JSON",
            CredentialSource::Fields { .. } => "individual environment variables",
        }
    }
}

impl PushConfig {
    pub fn load() -> Result<Self, AppError> {
        // Loads `.env` before anything below reads the environment.
        let common_config = core_config::Config::load()?;

        let request_timeout_secs = match get_env("FCM_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!(
                    "FCM_REQUEST_TIMEOUT_SECS must be a whole number of seconds: {}",
                    e
                ))
            })?,
            None => FcmConfig::default().request_timeout_secs,
        };

        Ok(PushConfig {
            common: common_config,
            fcm: FcmConfig {
                credentials: CredentialSource::resolve(|key| env::var(key).ok()),
                api_url: get_env("FCM_API_URL").unwrap_or_else(|| DEFAULT_FCM_API_URL.to_string()),
                request_timeout_secs,
                mock: get_env("FCM_MOCK")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(false),
            },
            static_dir: PathBuf::from(get_env("STATIC_DIR").unwrap_or_else(|| "public".to_string())),
            log_level: get_env("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            otlp_endpoint: get_env("OTLP_ENDPOINT"),
        })
    }
}

fn get_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}
