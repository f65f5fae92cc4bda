use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of a single (token, replica) send.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub token: String,
    /// 1-based replica number within this token's sends.
    pub message_index: u32,
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<OutcomeError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeError {
    pub code: String,
    pub message: String,
}

impl SendOutcome {
    pub fn delivered(token: String, message_index: u32, message_id: String) -> Self {
        Self {
            token,
            message_index,
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failed(token: String, message_index: u32, error: OutcomeError) -> Self {
        Self {
            token,
            message_index,
            success: false,
            message_id: None,
            error: Some(error),
        }
    }
}

/// Aggregate of one batch. `outcomes` is in generation order: every replica of
/// the first token, then every replica of the second, and so on.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub total_recipients: usize,
    pub replication_factor: u32,
    pub total_operations: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub outcomes: Vec<SendOutcome>,
    pub completed_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn assemble(
        total_recipients: usize,
        replication_factor: u32,
        outcomes: Vec<SendOutcome>,
    ) -> Self {
        let success_count = outcomes.iter().filter(|o| o.success).count();
        let failure_count = outcomes.len() - success_count;

        Self {
            total_recipients,
            replication_factor,
            total_operations: total_recipients * replication_factor as usize,
            success_count,
            failure_count,
            outcomes,
            completed_at: Utc::now(),
        }
    }
}
