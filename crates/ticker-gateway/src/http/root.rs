use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET / — service metadata.
pub async fn root_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "name": "Tick Server",
        "description": "Server-sent events service that broadcasts events every minute",
        "version": env!("CARGO_PKG_VERSION"),
        "build": env!("TICKER_GIT_SHA"),
        "environment": state.config.environment.as_str(),
        "endpoints": {
            "health": "/api/health",
            "stats": "/api/stats",
            "events": "/api/events",
            "testTick": "/api/test-tick (development only)",
        },
        "timestamp": super::now_iso(),
    }))
}
