//! The push message body and its default template.
//!
//! Bodies are opaque JSON objects in FCM's message shape. Caller overrides are
//! applied by replacing whole top-level keys; nested objects are never merged.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};

use super::iso_timestamp;

pub type MessageBody = Map<String, Value>;

/// Build the default message. `created_at` is stamped into `data.timestamp`.
pub fn default_template(created_at: DateTime<Utc>) -> MessageBody {
    let mut template = Map::new();

    template.insert(
        "notification".to_string(),
        json!({
            "title": "Test Notification",
            "body": "This is a push message test.",
        }),
    );
    template.insert(
        "data".to_string(),
        json!({
            "timestamp": iso_timestamp(created_at),
            "msg": "put any data you want to send",
        }),
    );
    template.insert(
        "android".to_string(),
        json!({
            "priority": "high",
            "notification": {
                "sound": "default",
                "channelId": "default",
            },
        }),
    );
    template.insert(
        "apns".to_string(),
        json!({
            "headers": {
                "apns-priority": "10",
            },
            "payload": {
                "aps": {
                    "content-available": 1,
                    "alert": {
                        "title": "Test Notification",
                        "body": "This is a push message test.",
                    },
                    "sound": "default",
                },
            },
        }),
    );

    template
}

/// Overlay `overrides` on `defaults`. A key present in both takes the
/// override's value wholesale; keys only in `defaults` are kept.
pub fn overlay(defaults: &MessageBody, overrides: Option<MessageBody>) -> MessageBody {
    let mut merged = defaults.clone();
    if let Some(overrides) = overrides {
        merged.extend(overrides);
    }
    merged
}
