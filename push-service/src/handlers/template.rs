use axum::{extract::State, Json};

use crate::models::MessageBody;
use crate::startup::AppState;

/// Echo the default message body so callers can copy and edit it.
pub async fn message_template(State(state): State<AppState>) -> Json<MessageBody> {
    Json(state.template.as_ref().clone())
}
