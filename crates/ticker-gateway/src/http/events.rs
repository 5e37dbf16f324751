//! Server-Sent Events endpoint — GET /events
//!
//! Query: `?clientId=xxx` (a UUID is generated when missing or blank).
//! Response: `text/event-stream`, one `data: <json>\n\n` frame per event,
//! starting with a "connected" acknowledgment and then one tick per minute.

use axum::{
    extract::{Query, State},
    http::{header::USER_AGENT, HeaderMap},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures_util::Stream;
use serde::Deserialize;
use std::{convert::Infallible, sync::Arc, time::Duration};
use ticker_core::config::{SINK_BUFFER, SSE_KEEPALIVE_SECS};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::sse;

#[derive(Deserialize)]
pub struct EventsQuery {
    #[serde(rename = "clientId")]
    pub client_id: Option<String>,
}

pub async fn events_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    let (sink, feed) = sse::channel(SINK_BUFFER);
    let client_id = state
        .ticks
        .subscribe(query.client_id.as_deref(), Box::new(sink));
    info!(client_id = %client_id, user_agent, "new SSE connection");

    if !feed.is_started() {
        return Err(ApiError::Unavailable(
            "Tick service is shutting down".to_string(),
        ));
    }

    Ok((feed.headers(), stream_response(feed)))
}

fn stream_response(feed: sse::SseFeed) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(feed.into_stream()).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keep-alive"),
    )
}
