use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /stats — subscriber count and uptime.
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "data": state.ticks.stats(),
        "timestamp": super::now_iso(),
    }))
}
