use std::any::Any;

use axum::{
    extract::OriginalUri,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use ticker_core::Environment;
use tracing::error;

/// Errors surfaced to HTTP callers as `{status, message}` JSON.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Route {0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Unavailable(String),

    /// `stack` carries panic detail; `None` in production.
    #[error("Internal Server Error")]
    Internal { stack: Option<String> },
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.status_code();
        // 4xx is the caller's fault ("fail"), 5xx is ours ("error").
        let status = if code.is_client_error() { "fail" } else { "error" };
        let message = self.to_string();
        let stack = match self {
            ApiError::Internal { stack } => stack,
            _ => None,
        };
        (
            code,
            Json(ErrorBody {
                status,
                message,
                stack,
            }),
        )
            .into_response()
    }
}

/// Router fallback for unmatched paths.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

/// Response builder for `CatchPanicLayer`: logs the panic and returns a 500,
/// attaching the panic detail outside production.
pub fn panic_response(
    environment: Environment,
) -> impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone {
    move |err| {
        let detail = if let Some(s) = err.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = err.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "unknown panic".to_string()
        };
        error!(panic = %detail, "request handler panicked");
        ApiError::Internal {
            stack: (!environment.is_production()).then_some(detail),
        }
        .into_response()
    }
}
