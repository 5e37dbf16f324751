use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;

/// POST /test-tick — broadcast the current minute's tick immediately.
/// Development only; every other environment gets 403.
pub async fn test_tick_handler(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    if !state.config.environment.is_development() {
        return Err(ApiError::Forbidden(
            "Test endpoint only available in development".to_string(),
        ));
    }

    let delivered = state.ticks.trigger_tick();
    info!(delivered, "manual tick triggered");

    Ok(Json(json!({
        "status": "ok",
        "message": "Manual tick triggered - check connected clients",
        "delivered": delivered,
        "timestamp": super::now_iso(),
    })))
}
