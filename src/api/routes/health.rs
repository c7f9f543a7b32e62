use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::infrastructure::app_state::AppState;

/// GET /api/health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "rooms": state.rooms.len(),
        "degraded": state.store.is_degraded(),
    }))
}
