//! FCM HTTP v1 request and response encoding.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{ProviderError, PushMessage};
use crate::models::MessageBody;

#[derive(Debug, Deserialize)]
pub struct SendResponse {
    /// `projects/{project_id}/messages/{message_id}`
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorStatus {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    details: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    #[serde(default)]
    error_code: Option<String>,
}

pub const INVALID_PAYLOAD: &str = "messaging/invalid-payload";

/// Top-level sections that must be JSON objects when present.
const OBJECT_SECTIONS: [&str; 5] = ["notification", "android", "apns", "webpush", "fcmOptions"];

/// Check the shape FCM requires of a message body before anything is sent.
pub fn validate_message(body: &MessageBody) -> Result<(), ProviderError> {
    for section in OBJECT_SECTIONS {
        if let Some(value) = body.get(section) {
            require_object(value, section)?;
        }
    }

    if let Some(data) = body.get("data") {
        require_string_map(data, "data")?;
    }

    if let Some(Value::Object(android)) = body.get("android") {
        if let Some(data) = android.get("data") {
            require_string_map(data, "android.data")?;
        }
        if let Some(notification) = android.get("notification") {
            require_object(notification, "android.notification")?;
        }
        match android.get("priority") {
            None => {}
            Some(Value::String(priority)) if priority == "high" || priority == "normal" => {}
            Some(_) => return Err(invalid_payload("android.priority must be 'high' or 'normal'")),
        }
    }

    if let Some(Value::Object(webpush)) = body.get("webpush") {
        if let Some(data) = webpush.get("data") {
            require_string_map(data, "webpush.data")?;
        }
    }

    Ok(())
}

fn require_object<'a>(
    value: &'a Value,
    label: &str,
) -> Result<&'a Map<String, Value>, ProviderError> {
    value
        .as_object()
        .ok_or_else(|| invalid_payload(&format!("{} must be a non-null object", label)))
}

fn require_string_map(value: &Value, label: &str) -> Result<(), ProviderError> {
    if require_object(value, label)?.values().all(Value::is_string) {
        Ok(())
    } else {
        Err(invalid_payload(&format!("{} must only contain string values", label)))
    }
}

fn invalid_payload(message: &str) -> ProviderError {
    ProviderError::Rejected {
        code: INVALID_PAYLOAD.to_string(),
        message: message.to_string(),
    }
}

/// Build the `messages:send` body for one token.
///
/// Bodies use the Admin SDK's camelCase spelling inside `android`; the REST
/// API expects snake_case there and an upper-case priority.
pub fn encode_message(push: &PushMessage) -> Value {
    let mut message = (*push.body).clone();

    if let Some(Value::Object(android)) = message.get_mut("android") {
        normalize_android(android);
    }

    message.insert("token".to_string(), Value::String(push.token.clone()));

    json!({ "message": message })
}

fn normalize_android(android: &mut Map<String, Value>) {
    snake_case_keys(android);

    if let Some(Value::String(priority)) = android.get_mut("priority") {
        *priority = priority.to_uppercase();
    }

    if let Some(Value::Object(notification)) = android.get_mut("notification") {
        snake_case_keys(notification);
    }
}

fn snake_case_keys(map: &mut Map<String, Value>) {
    *map = std::mem::take(map)
        .into_iter()
        .map(|(key, value)| (to_snake_case(&key), value))
        .collect();
}

fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Turn a non-2xx FCM response into a [`ProviderError::Rejected`].
pub fn decode_error(http_status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let error = envelope.error;
            // `details[].errorCode` is more specific than the canonical status.
            let fcm_code = error
                .details
                .iter()
                .find_map(|detail| detail.error_code.as_deref())
                .unwrap_or(&error.status);

            let code = match firebase_code(fcm_code) {
                "messaging/unknown-error" => code_for_status(http_status),
                code => code,
            };

            let message = if error.message.is_empty() {
                format!("FCM returned HTTP {}", http_status)
            } else {
                error.message
            };

            ProviderError::Rejected {
                code: code.to_string(),
                message,
            }
        }
        Err(_) => ProviderError::Rejected {
            code: code_for_status(http_status).to_string(),
            message: format!("FCM returned HTTP {}: {}", http_status, body),
        },
    }
}

fn firebase_code(fcm_code: &str) -> &'static str {
    match fcm_code {
        "UNREGISTERED" | "NOT_FOUND" => "messaging/registration-token-not-registered",
        "INVALID_ARGUMENT" => "messaging/invalid-argument",
        "SENDER_ID_MISMATCH" => "messaging/mismatched-credential",
        "QUOTA_EXCEEDED" | "RESOURCE_EXHAUSTED" => "messaging/message-rate-exceeded",
        "UNAVAILABLE" => "messaging/server-unavailable",
        "INTERNAL" => "messaging/internal-error",
        "THIRD_PARTY_AUTH_ERROR" => "messaging/third-party-auth-error",
        "UNAUTHENTICATED" | "PERMISSION_DENIED" => "messaging/authentication-error",
        _ => "messaging/unknown-error",
    }
}

fn code_for_status(http_status: u16) -> &'static str {
    match http_status {
        400 => "messaging/invalid-argument",
        401 | 403 => "messaging/authentication-error",
        404 => "messaging/registration-token-not-registered",
        429 => "messaging/message-rate-exceeded",
        500 => "messaging/internal-error",
        503 => "messaging/server-unavailable",
        _ => "messaging/unknown-error",
    }
}
