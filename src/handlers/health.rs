// src/handlers/health.rs

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "timestamp": Utc::now(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
    }))
}
