use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::models::{iso_timestamp, overlay, BatchReport, PushRequest, SendOutcome};
use crate::services::DispatchError;
use crate::startup::AppState;
use service_core::error::AppError;

pub const NOT_INITIALIZED: &str = "FCM is not initialized. Please check your environment variables.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSummary {
    pub total_tokens: usize,
    pub messages_per_token: u32,
    pub total_messages: usize,
    pub success_count: usize,
    pub failure_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub success: bool,
    pub summary: PushSummary,
    pub results: Vec<SendOutcome>,
    pub sent_at: String,
}

impl From<BatchReport> for PushResponse {
    fn from(report: BatchReport) -> Self {
        Self {
            success: true,
            summary: PushSummary {
                total_tokens: report.total_recipients,
                messages_per_token: report.replication_factor,
                total_messages: report.total_operations,
                success_count: report.success_count,
                failure_count: report.failure_count,
            },
            results: report.outcomes,
            sent_at: iso_timestamp(report.completed_at),
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        AppError::OperationFailed {
            code: err.code().map(str::to_owned),
            message: err.to_string(),
        }
    }
}

#[tracing::instrument(skip(state, payload))]
pub async fn send_push(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<PushResponse>, AppError> {
    let Some(dispatcher) = state.dispatcher.as_ref() else {
        return Err(AppError::NotReady(NOT_INITIALIZED.to_string()));
    };

    let request = match payload {
        Ok(Json(body)) => PushRequest::from(body),
        // No JSON content type reads as an empty body, which fails below as missing tokens.
        Err(JsonRejection::MissingJsonContentType(_)) => PushRequest::default(),
        Err(rejection) => return Err(AppError::BadRequest(rejection.body_text())),
    };

    let request = request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let body = overlay(&state.template, request.message_override);

    let report = dispatcher
        .dispatch(&request.recipients, request.replication_factor, body)
        .await?;

    Ok(Json(PushResponse::from(report)))
}
