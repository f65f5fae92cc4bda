//! Provider start-up. The returned handle is the readiness signal: `None`
//! means push requests are refused until the process is restarted with
//! working credentials.

use std::sync::Arc;

use super::providers::{FcmProvider, MockPushProvider, PushProvider, ServiceAccount};
use crate::config::FcmConfig;

pub fn initialize(config: &FcmConfig) -> Option<Arc<dyn PushProvider>> {
    if config.mock {
        tracing::warn!("FCM_MOCK is set, using mock push provider");
        return Some(Arc::new(MockPushProvider::new()));
    }

    let Some(source) = config.credentials.as_ref() else {
        tracing::warn!(
            "FCM initialization failed: no Firebase credentials found. Set \
             FIREBASE_SERVICE_ACCOUNT_PATH, FIREBASE_SERVICE_ACCOUNT, or \
             FIREBASE_PROJECT_ID/FIREBASE_PRIVATE_KEY/FIREBASE_CLIENT_EMAIL"
        );
        return None;
    };

    let provider = ServiceAccount::load(source)
        .and_then(|account| FcmProvider::new(account, config));

    match provider {
        Ok(provider) => {
            tracing::info!(
                source = source.describe(),
                project_id = provider.project_id(),
                "FCM initialized"
            );
            Some(Arc::new(provider))
        }
        Err(e) => {
            tracing::error!(source = source.describe(), error = %e, "FCM initialization error");
            None
        }
    }
}
