//! Liveness and metrics endpoints.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::Response,
};
use tracing::error;

use crate::http::errors::ApiError;
use crate::state::ApiState;

/// Constant liveness probe. Succeeds independent of analyzer availability
/// and never touches the job pipeline.
#[allow(clippy::unused_async)] // handler signature requires async
pub(crate) async fn healthz() -> &'static str {
    "ok"
}

/// Prometheus text-format metrics.
#[allow(clippy::unused_async)] // handler signature requires async
pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.metrics.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}
