use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::MessageBody;

pub const DEFAULT_MESSAGES_PER_TOKEN: u32 = 10;
pub const MAX_MESSAGES_PER_TOKEN: u32 = 100;

/// Keys that identify a recipient; they never survive into the shared body.
const RECIPIENT_KEYS: [&str; 2] = ["tokens", "token"];

/// Raw `POST /push` body. Fields stay loosely typed so validation can report
/// the exact problem instead of a generic deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    #[serde(default)]
    pub tokens: Option<Value>,
    #[serde(default)]
    pub messages_per_token: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("tokens array is required.")]
    MissingTokens,

    #[error("tokens must be an array.")]
    TokensNotArray,

    #[error("tokens array is empty.")]
    EmptyTokens,

    #[error("tokens must contain only strings.")]
    NonStringToken,

    #[error("tokens must not contain empty values.")]
    BlankToken,
}

/// A validated batch: who to send to, how many times, and what to overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct SendRequest {
    pub recipients: Vec<String>,
    pub replication_factor: u32,
    pub message_override: Option<MessageBody>,
}

impl SendRequest {
    pub fn total_operations(&self) -> usize {
        self.recipients.len() * self.replication_factor as usize
    }
}

impl From<Value> for PushRequest {
    /// Any JSON body is accepted; one that is not an object carries no fields.
    fn from(body: Value) -> Self {
        match body {
            Value::Object(_) => serde_json::from_value(body).unwrap_or_default(),
            _ => PushRequest::default(),
        }
    }
}

/// `null`, `false`, `0` and `""` all count as an absent field.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

impl PushRequest {
    pub fn validate(self) -> Result<SendRequest, RequestError> {
        let tokens = match self.tokens {
            None => return Err(RequestError::MissingTokens),
            Some(ref value) if is_blank(value) => return Err(RequestError::MissingTokens),
            Some(Value::Array(tokens)) => tokens,
            Some(_) => return Err(RequestError::TokensNotArray),
        };

        if tokens.is_empty() {
            return Err(RequestError::EmptyTokens);
        }

        let recipients = tokens
            .into_iter()
            .map(|token| match token {
                Value::String(token) if token.is_empty() => Err(RequestError::BlankToken),
                Value::String(token) => Ok(token),
                _ => Err(RequestError::NonStringToken),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let message_override = match self.message {
            Some(Value::Object(mut message)) => {
                for key in RECIPIENT_KEYS {
                    message.remove(key);
                }
                Some(message)
            }
            _ => None,
        };

        Ok(SendRequest {
            recipients,
            replication_factor: resolve_messages_per_token(self.messages_per_token.as_ref()),
            message_override,
        })
    }
}

/// Lenient: a numeric value (or numeric string) in [1, 100] is truncated and
/// used. Everything else falls back to the default.
pub fn resolve_messages_per_token(value: Option<&Value>) -> u32 {
    let requested = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match requested {
        Some(n) if (1.0..=f64::from(MAX_MESSAGES_PER_TOKEN)).contains(&n) => n.trunc() as u32,
        _ => DEFAULT_MESSAGES_PER_TOKEN,
    }
}
