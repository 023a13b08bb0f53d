//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    http::{Method, StatusCode, header::CONTENT_TYPE},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use datascribe_job::JobExecutor;
use datascribe_telemetry::{
    Metrics, build_sha, propagate_request_id_layer, set_request_id_layer,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::{MAX_UPLOAD_BYTES, METHOD_GUIDANCE};
use crate::http::errors::ApiError;
use crate::http::health::{healthz, metrics as metrics_endpoint};
use crate::http::predict::{predict, preflight};
use crate::state::ApiState;

/// Axum router wrapper hosting the `DataScribe` API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct the API server with its dependencies wired through shared
    /// state. Handlers are registered once here; there is no per-request
    /// global mutable state.
    #[must_use]
    pub fn new(executor: Arc<dyn JobExecutor>, metrics: Metrics) -> Self {
        Self::with_upload_limit(executor, metrics, MAX_UPLOAD_BYTES)
    }

    pub(crate) fn with_upload_limit(
        executor: Arc<dyn JobExecutor>,
        metrics: Metrics,
        upload_limit: usize,
    ) -> Self {
        let state = Arc::new(ApiState::new(executor, metrics));

        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %request.uri().path(),
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    span.record(
                        "latency_ms",
                        u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                    );
                },
            );
        let layered = ServiceBuilder::new()
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
            .layer(trace_layer);

        let router = Router::new()
            .route("/healthz", get(healthz))
            .route("/metrics", get(metrics_endpoint))
            .route("/predict", post(predict).options(preflight))
            .route_layer(layered)
            .method_not_allowed_fallback(method_guidance)
            .fallback(method_guidance)
            .layer(middleware::from_fn_with_state(
                Arc::clone(&state),
                track_http_metrics,
            ))
            .layer(cors_layer)
            .layer(DefaultBodyLimit::max(upload_limit))
            .with_state(state);

        Self { router }
    }

    /// Consume the server, returning the underlying router for embedding or
    /// in-process testing.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve the API using the configured router on the supplied address.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server
    /// terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        tracing::info!(addr = %addr, "starting api listener");
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })?;
        Ok(())
    }
}

/// Any method or path outside the wire contract gets a 405 naming the
/// expected interface.
#[allow(clippy::unused_async)] // handler signature requires async
async fn method_guidance() -> ApiError {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, METHOD_GUIDANCE)
}

async fn track_http_metrics(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    let route = request.uri().path().to_string();
    let response = next.run(request).await;
    state
        .metrics
        .inc_http_request(&route, response.status().as_u16());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use datascribe_job::{JobError, JobReport, JobResult};
    use std::path::Path;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    struct NoopExecutor;

    #[async_trait]
    impl JobExecutor for NoopExecutor {
        async fn run(
            &self,
            _input: &Path,
            _output: &Path,
            _cancel: CancellationToken,
        ) -> JobResult<JobReport> {
            Err(JobError::Cancelled)
        }
    }

    fn test_router() -> Router {
        let metrics = Metrics::new().expect("metrics registry");
        ApiServer::new(Arc::new(NoopExecutor), metrics).into_router()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn healthz_answers_ok_without_touching_the_pipeline() {
        let response = test_router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_job_counters() {
        let response = test_router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let text = body_text(response).await;
        assert!(text.contains("jobs_started_total"));
    }

    #[tokio::test]
    async fn bare_options_probe_succeeds_with_empty_body() {
        let response = test_router()
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/predict")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn browser_preflight_gets_permissive_cors_headers() {
        let response = test_router()
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/predict")
                    .header("origin", "https://app.example")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let allow_origin = response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|value| value.to_str().ok());
        assert_eq!(allow_origin, Some("*"));
    }

    #[tokio::test]
    async fn wrong_method_gets_guidance() {
        let response = test_router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/predict")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(body_text(response).await.contains("POST /predict"));
    }

    #[tokio::test]
    async fn unknown_path_gets_guidance() {
        let response = test_router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(body_text(response).await.contains("GET /healthz"));
    }
}
