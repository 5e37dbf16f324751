use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use ticker_core::config::TickerConfig;
use ticker_scheduler::TickService;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::error::{not_found, panic_response};
use crate::http::{
    events::events_handler, health::health_handler, root::root_handler, stats::stats_handler,
    test_tick::test_tick_handler,
};

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; connect-src 'self' 'unsafe-inline'; \
     script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'";

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: TickerConfig,
    pub ticks: Arc<TickService>,
}

impl AppState {
    pub fn new(config: TickerConfig, ticks: Arc<TickService>) -> Self {
        Self { config, ticks }
    }
}

/// Assemble the full Axum router. API routes are served at the root and
/// mirrored under `/api`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/events", get(events_handler))
        .route("/test-tick", post(test_tick_handler));

    let router = Router::new()
        .route("/", get(root_handler))
        .merge(api.clone())
        .nest("/api", api)
        .fallback(not_found)
        .with_state(Arc::clone(&state));

    with_layers(router, &state.config)
}

/// Panic catching, security headers, compression, CORS and request tracing.
pub fn with_layers(router: Router, config: &TickerConfig) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response(config.environment)))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config.cors_origin))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::CACHE_CONTROL,
        ]);

    // Credentials cannot be combined with a wildcard origin.
    if origin == "*" {
        return cors.allow_origin(Any);
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => cors.allow_origin(value).allow_credentials(true),
        Err(e) => {
            warn!(%origin, error = %e, "invalid CORS origin; cross-origin requests disabled");
            cors
        }
    }
}
