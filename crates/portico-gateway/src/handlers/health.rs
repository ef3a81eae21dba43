//! GET /health - liveness probe with the live route count.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "routes": state.engine.len() }))
}

pub fn health_router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
