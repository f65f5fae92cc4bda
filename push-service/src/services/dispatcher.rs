//! Batch fan-out: one send per (token, replica), all in flight at once.

use std::sync::Arc;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

use super::metrics::record_batch;
use super::providers::wire::validate_message;
use super::providers::{ProviderError, PushMessage, PushProvider};
use crate::models::{BatchReport, MessageBody, OutcomeError, SendOutcome};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Send task did not complete: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("No outcome recorded for send #{0}")]
    MissingOutcome(usize),

    /// The message body was refused before any send started.
    #[error("{0}")]
    InvalidMessage(ProviderError),
}

impl DispatchError {
    /// Provider error code carried to the caller, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            DispatchError::InvalidMessage(e) => Some(e.code()),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct BatchDispatcher {
    provider: Arc<dyn PushProvider>,
}

impl BatchDispatcher {
    pub fn new(provider: Arc<dyn PushProvider>) -> Self {
        Self { provider }
    }

    /// Send `body` to every token `replication_factor` times and wait for all
    /// sends to settle.
    ///
    /// A provider error fails only its own outcome. Outcomes are reported in
    /// generation order (token order, then replica order) whatever order the
    /// sends finish in. Only a task that dies without reporting fails the
    /// whole batch, and even then the remaining sends run to completion. A body
    /// FCM would refuse fails the batch before anything is sent.
    #[tracing::instrument(
        skip_all,
        fields(
            provider = self.provider.name(),
            total_tokens = recipients.len(),
            messages_per_token = replication_factor,
        )
    )]
    pub async fn dispatch(
        &self,
        recipients: &[String],
        replication_factor: u32,
        body: MessageBody,
    ) -> Result<BatchReport, DispatchError> {
        validate_message(&body).map_err(DispatchError::InvalidMessage)?;

        let body = Arc::new(body);
        let total = recipients.len() * replication_factor as usize;

        let mut tasks = JoinSet::new();
        let mut slot = 0;
        for token in recipients {
            for message_index in 1..=replication_factor {
                let provider = Arc::clone(&self.provider);
                let push = PushMessage {
                    token: token.clone(),
                    body: Arc::clone(&body),
                };

                tasks.spawn(
                    async move {
                        let outcome = match provider.send(&push).await {
                            Ok(message_id) => {
                                SendOutcome::delivered(push.token, message_index, message_id)
                            }
                            Err(e) => {
                                tracing::debug!(
                                    token = %push.token,
                                    message_index,
                                    code = e.code(),
                                    error = %e,
                                    "Push send failed"
                                );
                                SendOutcome::failed(push.token, message_index, OutcomeError::from(&e))
                            }
                        };
                        (slot, outcome)
                    }
                    .in_current_span(),
                );
                slot += 1;
            }
        }

        let mut slots: Vec<Option<SendOutcome>> = vec![None; total];
        let mut task_failure = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, outcome)) => slots[slot] = Some(outcome),
                Err(e) => {
                    tracing::error!(error = %e, "Push send task failed");
                    if task_failure.is_none() {
                        task_failure = Some(e);
                    }
                }
            }
        }

        if let Some(e) = task_failure {
            return Err(DispatchError::TaskFailed(e));
        }

        let outcomes = slots
            .into_iter()
            .enumerate()
            .map(|(slot, outcome)| outcome.ok_or(DispatchError::MissingOutcome(slot)))
            .collect::<Result<Vec<_>, _>>()?;

        let report = BatchReport::assemble(recipients.len(), replication_factor, outcomes);

        record_batch(self.provider.name(), &report);
        tracing::info!(
            success_count = report.success_count,
            failure_count = report.failure_count,
            total_tokens = report.total_recipients,
            messages_per_token = report.replication_factor,
            total_messages = report.total_operations,
            "Push messages sent"
        );

        Ok(report)
    }
}
