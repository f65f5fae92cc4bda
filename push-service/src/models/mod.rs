pub mod message;
pub mod report;
pub mod request;

pub use message::{default_template, overlay, MessageBody};
pub use report::{BatchReport, OutcomeError, SendOutcome};
pub use request::{
    resolve_messages_per_token, PushRequest, RequestError, SendRequest,
    DEFAULT_MESSAGES_PER_TOKEN, MAX_MESSAGES_PER_TOKEN,
};

use chrono::{DateTime, SecondsFormat, Utc};

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
