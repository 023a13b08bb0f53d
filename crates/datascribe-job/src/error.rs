//! Error types for the job pipeline.
//!
//! # Design
//!
//! - Keep error messages constant; capture operational context in fields.
//! - Preserve source errors for diagnostics without double-logging.
//! - Analyzer diagnostics are carried as data so callers decide how much to
//!   surface.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for job pipeline operations.
pub type JobResult<T> = Result<T, JobError>;

/// Errors produced by the job pipeline.
#[derive(Debug, Error)]
pub enum JobError {
    /// IO failures while managing the workspace or its files.
    #[error("job io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Launching the external analyzer failed.
    #[error("failed to launch analyzer")]
    Spawn {
        /// Program that could not be started.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The analyzer ran but reported failure.
    #[error("analysis failed")]
    Analyzer {
        /// Process exit code when the analyzer was not killed by a signal.
        status: Option<i32>,
        /// Captured diagnostic output (bounded), surfaced verbatim to callers.
        diagnostics: String,
    },
    /// The analyzer reported success but did not produce the artifact.
    #[error("analyzer produced no artifact")]
    MissingArtifact {
        /// Expected artifact path.
        path: PathBuf,
    },
    /// The run was cancelled before the analyzer completed.
    #[error("analysis cancelled")]
    Cancelled,
}

impl JobError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
