//! HTTP handlers for push-service.

pub mod health;
pub mod push;
pub mod template;

pub use health::{health_check, metrics_endpoint};
pub use push::{send_push, PushResponse, PushSummary};
pub use template::message_template;
