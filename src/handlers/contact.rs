// src/handlers/contact.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::AppError, extract::AppJson, models::contact::ContactRequest, state::AppState,
};

/// Public contact form. The message is stored exactly as submitted.
pub async fn submit_contact(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ContactRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let saved = state.contacts.save_message(payload).await?;
    tracing::info!(message_id = saved.id, "Contact message received");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Message received!",
        })),
    ))
}
