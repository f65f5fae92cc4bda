use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    /// A required upstream capability has not been set up.
    #[error("{0}")]
    NotReady(String),

    /// A request-level operation failed, optionally carrying the upstream error code.
    #[error("{message}")]
    OperationFailed {
        message: String,
        code: Option<String>,
    },

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

/// JSON body written for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, code) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotReady(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
            AppError::OperationFailed { message, code } => {
                tracing::error!(error = %message, code = ?code, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, message, code)
            }
            AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string(), None)
            }
            AppError::ConfigError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Configuration error: {}", err),
                None,
            ),
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error,
                code,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn bad_request_maps_to_400_without_code() {
        let response = AppError::BadRequest("tokens array is empty.".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "tokens array is empty.");
        assert!(body.get("code").is_none());
    }

    #[tokio::test]
    async fn operation_failure_carries_code() {
        let response = AppError::OperationFailed {
            message: "boom".to_string(),
            code: Some("messaging/internal-error".to_string()),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "boom");
        assert_eq!(body["code"], "messaging/internal-error");
    }

    #[tokio::test]
    async fn not_ready_maps_to_500() {
        let response = AppError::NotReady("not initialized".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["success"], false);
    }
}
