//! The upload → analyze → stream pipeline endpoint.
//!
//! One request is one job: locate the upload field, persist it into a fresh
//! workspace, hand the paths to the analyzer, then stream the artifact back.
//! The stages are strictly sequential because each stage's output is the
//! next stage's input, and the workspace is destroyed on every exit path.

use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    extract::{
        State,
        multipart::{Field, Multipart},
    },
    http::{
        StatusCode,
        header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
};
use datascribe_job::{JobError, Workspace};
use futures_core::Stream;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::http::constants::{
    REPORT_CACHE_CONTROL, REPORT_CONTENT_TYPE, REPORT_DISPOSITION, UPLOAD_FIELD_NAME,
};
use crate::http::errors::ApiError;
use crate::state::ApiState;

/// Non-preflight OPTIONS probes get a bare 200; real browser preflights are
/// answered by the CORS layer before reaching this handler.
#[allow(clippy::unused_async)] // handler signature requires async
pub(crate) async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Submit a CSV, receive the analysis report.
pub(crate) async fn predict(
    State(state): State<Arc<ApiState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    state.metrics.inc_job_started();
    let result = run_pipeline(&state, multipart).await;
    match &result {
        Ok(_) => state.metrics.inc_job_succeeded(),
        Err(err) => {
            state.metrics.inc_job_failed();
            warn!(status = err.status.as_u16(), message = %err.message, "job failed");
        }
    }
    result
}

async fn run_pipeline(
    state: &Arc<ApiState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    // Parsing: locate the upload field before any filesystem side effects.
    let mut saved = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::from_multipart(&err))?
    {
        if field.name() != Some(UPLOAD_FIELD_NAME) {
            continue;
        }
        let client_name = field.file_name().unwrap_or_default().to_string();
        let workspace = Workspace::create().map_err(|err| ApiError::from_job(&err))?;
        match save_upload(&workspace, &client_name, &mut field).await {
            Ok(input_path) => {
                saved = Some((workspace, input_path));
                break;
            }
            Err(err) => {
                workspace.destroy();
                return Err(err);
            }
        }
    }
    let Some((workspace, input_path)) = saved else {
        return Err(ApiError::bad_request("missing 'file' field in form-data"));
    };

    info!(
        job_id = %workspace.id(),
        started_at = %workspace.created_at(),
        input = %input_path.display(),
        "input saved; starting analysis"
    );

    // The analysis owns the workspace on a detached task: an abandoned
    // client connection must not interrupt a running analyzer or delete the
    // directory out from under it.
    let executor = Arc::clone(&state.executor);
    let report_path = workspace.report_path();
    let job = tokio::spawn(async move {
        let result = executor
            .run(&input_path, &report_path, CancellationToken::new())
            .await;
        (workspace, result)
    });
    let (workspace, result) = job
        .await
        .map_err(|err| ApiError::internal(format!("analysis task failed: {err}")))?;

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            let api_err = ApiError::from_job(&err);
            workspace.destroy();
            return Err(api_err);
        }
    };
    state.metrics.observe_analysis_latency(report.duration);

    stream_artifact(workspace).await
}

async fn save_upload(
    workspace: &Workspace,
    client_name: &str,
    field: &mut Field<'_>,
) -> Result<PathBuf, ApiError> {
    let (path, mut file) = workspace
        .create_input_file(client_name)
        .await
        .map_err(|err| ApiError::from_job(&err))?;

    let mut written: usize = 0;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|err| ApiError::from_multipart(&err))?
    {
        file.write_all(&chunk).await.map_err(|source| {
            ApiError::from_job(&JobError::Io {
                operation: "workspace.save_upload",
                path: path.clone(),
                source,
            })
        })?;
        written += chunk.len();
    }
    file.flush().await.map_err(|source| {
        ApiError::from_job(&JobError::Io {
            operation: "workspace.save_upload",
            path: path.clone(),
            source,
        })
    })?;

    debug!(path = %path.display(), bytes = written, "upload persisted");
    Ok(path)
}

async fn stream_artifact(workspace: Workspace) -> Result<Response, ApiError> {
    let report_path = workspace.report_path();
    let file = match File::open(&report_path).await {
        Ok(file) => file,
        Err(source) => {
            let api_err = if source.kind() == io::ErrorKind::NotFound {
                ApiError::from_job(&JobError::MissingArtifact {
                    path: report_path.clone(),
                })
            } else {
                ApiError::from_job(&JobError::Io {
                    operation: "artifact.open",
                    path: report_path.clone(),
                    source,
                })
            };
            workspace.destroy();
            return Err(api_err);
        }
    };
    let length = file.metadata().await.ok().map(|meta| meta.len());

    let body = Body::from_stream(ArtifactBody::new(file, workspace));
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, REPORT_CONTENT_TYPE)
        .header(CONTENT_DISPOSITION, REPORT_DISPOSITION)
        .header(CACHE_CONTROL, REPORT_CACHE_CONTROL);
    if let Some(length) = length {
        builder = builder.header(CONTENT_LENGTH, length);
    }
    builder
        .body(body)
        .map_err(|err| ApiError::internal(format!("failed to build response: {err}")))
}

/// Streams the artifact while owning the workspace, destroying it when the
/// body completes, fails, or is dropped by a client disconnect.
struct ArtifactBody {
    inner: ReaderStream<File>,
    workspace: Option<Workspace>,
}

impl ArtifactBody {
    fn new(file: File, workspace: Workspace) -> Self {
        Self {
            inner: ReaderStream::new(file),
            workspace: Some(workspace),
        }
    }

    fn finish(&mut self) {
        if let Some(workspace) = self.workspace.take() {
            workspace.destroy();
        }
    }
}

impl Stream for ArtifactBody {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match Pin::new(&mut this.inner).poll_next(cx) {
            Poll::Ready(None) => {
                this.finish();
                Poll::Ready(None)
            }
            Poll::Ready(Some(Err(err))) => {
                // Headers are already committed; the failure can only be logged.
                warn!(error = %err, "error streaming report");
                this.finish();
                Poll::Ready(Some(Err(err)))
            }
            poll => poll,
        }
    }
}

impl Drop for ArtifactBody {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::ApiServer;
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use axum::http::Request;
    use datascribe_job::{JobExecutor, JobReport, JobResult};
    use datascribe_telemetry::Metrics;
    use datascribe_test_support::multipart::{MultipartBuilder, csv_upload};
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    enum StubMode {
        WriteArtifact(Vec<u8>),
        SkipArtifact,
        Fail {
            status: Option<i32>,
            diagnostics: String,
        },
    }

    struct StubExecutor {
        mode: StubMode,
        invoked: AtomicBool,
        seen_workspace: Mutex<Option<PathBuf>>,
    }

    impl StubExecutor {
        fn new(mode: StubMode) -> Arc<Self> {
            Arc::new(Self {
                mode,
                invoked: AtomicBool::new(false),
                seen_workspace: Mutex::new(None),
            })
        }

        fn workspace_path(&self) -> Option<PathBuf> {
            self.seen_workspace.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl JobExecutor for StubExecutor {
        async fn run(
            &self,
            input: &Path,
            output: &Path,
            _cancel: CancellationToken,
        ) -> JobResult<JobReport> {
            self.invoked.store(true, Ordering::SeqCst);
            *self.seen_workspace.lock().expect("lock") = output.parent().map(Path::to_path_buf);
            assert!(input.exists(), "input must be persisted before the run");
            match &self.mode {
                StubMode::WriteArtifact(bytes) => {
                    tokio::fs::write(output, bytes)
                        .await
                        .map_err(|source| JobError::Io {
                            operation: "stub.write",
                            path: output.to_path_buf(),
                            source,
                        })?;
                    Ok(JobReport {
                        duration: Duration::from_millis(5),
                    })
                }
                StubMode::SkipArtifact => Ok(JobReport {
                    duration: Duration::from_millis(5),
                }),
                StubMode::Fail {
                    status,
                    diagnostics,
                } => Err(JobError::Analyzer {
                    status: *status,
                    diagnostics: diagnostics.clone(),
                }),
            }
        }
    }

    fn router_for(stub: Arc<StubExecutor>) -> axum::Router {
        let metrics = Metrics::new().expect("metrics registry");
        ApiServer::new(stub, metrics).into_router()
    }

    fn upload_request(content_type: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .expect("request")
    }

    #[tokio::test]
    async fn happy_path_streams_artifact_and_cleans_up() {
        let stub = StubExecutor::new(StubMode::WriteArtifact(b"%PDF-1.4 stub".to_vec()));
        let router = router_for(Arc::clone(&stub));

        let (content_type, body) = csv_upload("file", "data.csv", b"a,b\n1,2\n");
        let response = router
            .oneshot(upload_request(&content_type, body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers().clone();
        assert_eq!(
            headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some(REPORT_CONTENT_TYPE)
        );
        assert!(
            headers
                .get(CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.contains("report.pdf"))
        );
        assert_eq!(
            headers.get(CACHE_CONTROL).and_then(|v| v.to_str().ok()),
            Some(REPORT_CACHE_CONTROL)
        );

        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(bytes.as_ref(), b"%PDF-1.4 stub");

        let workspace = stub.workspace_path().expect("executor saw the workspace");
        assert!(
            !workspace.exists(),
            "workspace must be destroyed once the body is drained"
        );
    }

    #[tokio::test]
    async fn missing_file_field_never_reaches_the_analyzer() {
        let stub = StubExecutor::new(StubMode::WriteArtifact(Vec::new()));
        let router = router_for(Arc::clone(&stub));

        let (content_type, body) = MultipartBuilder::new()
            .text_field("note", "no file here")
            .finish();
        let response = router
            .oneshot(upload_request(&content_type, body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert!(String::from_utf8_lossy(&bytes).contains("missing 'file' field"));
        assert!(!stub.invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn malformed_multipart_is_a_client_error() {
        let stub = StubExecutor::new(StubMode::WriteArtifact(Vec::new()));
        let router = router_for(Arc::clone(&stub));

        let response = router
            .oneshot(upload_request(
                "multipart/form-data; boundary=broken",
                b"this is not multipart".to_vec(),
            ))
            .await
            .expect("response");

        assert!(response.status().is_client_error());
        assert!(!stub.invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn analyzer_failure_surfaces_diagnostics_and_cleans_up() {
        let stub = StubExecutor::new(StubMode::Fail {
            status: Some(1),
            diagnostics: "invalid column: x".to_string(),
        });
        let router = router_for(Arc::clone(&stub));

        let (content_type, body) = csv_upload("file", "data.csv", b"a\n1\n");
        let response = router
            .oneshot(upload_request(&content_type, body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert!(String::from_utf8_lossy(&bytes).contains("invalid column: x"));

        let workspace = stub.workspace_path().expect("executor saw the workspace");
        assert!(!workspace.exists());
    }

    #[tokio::test]
    async fn missing_artifact_after_success_is_a_server_error() {
        let stub = StubExecutor::new(StubMode::SkipArtifact);
        let router = router_for(Arc::clone(&stub));

        let (content_type, body) = csv_upload("file", "data.csv", b"a\n1\n");
        let response = router
            .oneshot(upload_request(&content_type, body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert!(String::from_utf8_lossy(&bytes).contains("no artifact"));

        let workspace = stub.workspace_path().expect("executor saw the workspace");
        assert!(!workspace.exists());
    }

    #[tokio::test]
    async fn traversal_upload_name_stays_inside_the_workspace() {
        let stub = StubExecutor::new(StubMode::WriteArtifact(b"pdf".to_vec()));
        let router = router_for(Arc::clone(&stub));

        let (content_type, body) = csv_upload("file", "../../etc/passwd", b"a\n1\n");
        let response = router
            .oneshot(upload_request(&content_type, body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let _ = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        // The executor asserted the input existed inside the workspace; a
        // traversal would have placed it elsewhere and tripped that check.
        assert!(stub.invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn oversize_upload_is_rejected_before_analysis() {
        let stub = StubExecutor::new(StubMode::WriteArtifact(Vec::new()));
        let metrics = Metrics::new().expect("metrics registry");
        let router =
            ApiServer::with_upload_limit(
                Arc::clone(&stub) as Arc<dyn JobExecutor>,
                metrics,
                1024,
            )
            .into_router();

        let oversized = vec![b'x'; 8 * 1024];
        let (content_type, body) = csv_upload("file", "data.csv", &oversized);
        let response = router
            .oneshot(upload_request(&content_type, body))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(!stub.invoked.load(Ordering::SeqCst));
    }
}
