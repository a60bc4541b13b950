use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::infra::app_state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let backend = state
        .config
        .as_ref()
        .map(|config| config.storage.backend.to_string());
    Json(json!({
        "status": "ok",
        "backend": backend,
    }))
}
