use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{session::SessionInfo, AppState};

/// Running quizzes, oldest first
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<SessionInfo>> {
    Json(state.registry.summary())
}
