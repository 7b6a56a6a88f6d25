use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "kanji-quiz-bot",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": (Utc::now() - state.started_at).num_seconds(),
        "active_quizzes": state.registry.summary().len(),
    }))
}
