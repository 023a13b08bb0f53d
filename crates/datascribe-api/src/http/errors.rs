//! Plain-text API error responses.
//!
//! The browser collaborator treats every non-success body as opaque UTF-8
//! error text, so failures are rendered as `text/plain` rather than a
//! structured problem document. Job failures carry the analyzer's captured
//! stderr verbatim: surfacing internals is a deliberate operability choice.

use axum::{
    extract::multipart::MultipartError,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use datascribe_job::JobError;

/// Structured API error rendered as a plain-text response.
#[derive(Debug)]
pub(crate) struct ApiError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ApiError {
    pub(crate) fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Multipart failures keep the extractor's status so an exceeded body
    /// limit stays a 413 while malformed form data stays a 400.
    pub(crate) fn from_multipart(err: &MultipartError) -> Self {
        Self::new(
            err.status(),
            format!("failed to parse form: {}", err.body_text()),
        )
    }

    /// Map the job pipeline taxonomy onto wire responses: everything past
    /// intake is a server-side failure.
    pub(crate) fn from_job(err: &JobError) -> Self {
        match err {
            JobError::Io {
                operation, source, ..
            } => Self::internal(format!("{operation} failed: {source}")),
            JobError::Spawn { program, source } => {
                Self::internal(format!("analysis failed: could not run {program}: {source}"))
            }
            JobError::Analyzer {
                status,
                diagnostics,
            } => {
                let status_text = status.map_or_else(
                    || "terminated by signal".to_string(),
                    |code| format!("exit status {code}"),
                );
                Self::internal(format!("analysis failed: {status_text}\n{diagnostics}"))
            }
            JobError::MissingArtifact { path } => Self::internal(format!(
                "analysis succeeded but produced no artifact at {}",
                path.display()
            )),
            JobError::Cancelled => Self::internal("analysis cancelled before completion"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_failure_surfaces_diagnostics_verbatim() {
        let err = ApiError::from_job(&JobError::Analyzer {
            status: Some(1),
            diagnostics: "invalid column: x".to_string(),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("exit status 1"));
        assert!(err.message.contains("invalid column: x"));
    }

    #[test]
    fn signal_termination_is_described() {
        let err = ApiError::from_job(&JobError::Analyzer {
            status: None,
            diagnostics: String::new(),
        });
        assert!(err.message.contains("terminated by signal"));
    }

    #[test]
    fn missing_artifact_is_a_server_error() {
        let err = ApiError::from_job(&JobError::MissingArtifact {
            path: "/tmp/ws/report.pdf".into(),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.message.contains("no artifact"));
    }

    #[test]
    fn responses_are_plain_text() {
        let response = ApiError::bad_request("missing 'file' field in form-data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert!(content_type.starts_with("text/plain"));
    }
}
