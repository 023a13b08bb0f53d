//! Isolated per-job workspace directories.
//!
//! Each request gets a fresh uniquely-named directory holding the saved
//! upload and the analyzer's artifact. The directory is removed exactly once
//! on every exit path: explicitly via [`Workspace::destroy`], or by the
//! `TempDir` drop backstop when the owner unwinds early.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::{Builder, TempDir};
use tokio::fs::File;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{JobError, JobResult};

/// Fixed artifact name inside every workspace. Never derived from client
/// input, which closes off path injection via the upload name.
pub const REPORT_FILE_NAME: &str = "report.pdf";

/// Saved-upload name used when the client supplies no usable filename.
pub const FALLBACK_INPUT_NAME: &str = "upload.csv";

const WORKSPACE_PREFIX: &str = "datascribe-job-";

/// An isolated filesystem scope owned by exactly one request.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    created_at: DateTime<Utc>,
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace directory with no collision with any other
    /// live or past workspace.
    ///
    /// # Errors
    ///
    /// Returns `JobError::Io` when the directory cannot be created.
    pub fn create() -> JobResult<Self> {
        let dir = Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(|source| JobError::io("workspace.create", std::env::temp_dir(), source))?;
        let workspace = Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            dir,
        };
        debug!(job_id = %workspace.id, path = %workspace.path().display(), "workspace created");
        Ok(workspace)
    }

    /// Identifier of the job bound to this workspace.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Creation timestamp of the job bound to this workspace.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Root directory of the workspace.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// On-disk location for the uploaded input, derived from the sanitised
    /// client filename.
    #[must_use]
    pub fn input_path(&self, client_name: &str) -> PathBuf {
        self.path().join(sanitize_file_name(client_name))
    }

    /// Fixed location the analyzer must write the artifact to.
    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.path().join(REPORT_FILE_NAME)
    }

    /// Create the input file for an upload, returning its path and an open
    /// handle for streaming writes.
    ///
    /// # Errors
    ///
    /// Returns `JobError::Io` when the file cannot be created.
    pub async fn create_input_file(&self, client_name: &str) -> JobResult<(PathBuf, File)> {
        let path = self.input_path(client_name);
        let file = File::create(&path)
            .await
            .map_err(|source| JobError::io("workspace.create_input", path.clone(), source))?;
        Ok((path, file))
    }

    /// Recursively remove the workspace. Cleanup failures are logged and
    /// never surfaced: by this point the response outcome is already decided.
    pub fn destroy(self) {
        let id = self.id;
        let path = self.dir.path().to_path_buf();
        if let Err(err) = self.dir.close() {
            warn!(job_id = %id, path = %path.display(), error = %err, "workspace cleanup failed");
        } else {
            debug!(job_id = %id, path = %path.display(), "workspace destroyed");
        }
    }
}

/// Strip any directory components from a client-supplied filename, keeping
/// only the final path segment; empty or degenerate names fall back to
/// [`FALLBACK_INPUT_NAME`].
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let candidate = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if candidate.is_empty() || candidate == "." || candidate == ".." {
        FALLBACK_INPUT_NAME.to_string()
    } else {
        candidate.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_path_traversal_attempts() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("..\\..\\evil.csv"), "evil.csv");
        assert_eq!(sanitize_file_name("/absolute/data.csv"), "data.csv");
    }

    #[test]
    fn sanitizes_degenerate_names_to_fallback() {
        assert_eq!(sanitize_file_name(""), FALLBACK_INPUT_NAME);
        assert_eq!(sanitize_file_name("   "), FALLBACK_INPUT_NAME);
        assert_eq!(sanitize_file_name(".."), FALLBACK_INPUT_NAME);
        assert_eq!(sanitize_file_name("dir/"), FALLBACK_INPUT_NAME);
    }

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(sanitize_file_name("data.csv"), "data.csv");
    }

    #[test]
    fn workspaces_are_unique_and_isolated() -> JobResult<()> {
        let first = Workspace::create()?;
        let second = Workspace::create()?;
        assert_ne!(first.path(), second.path());
        assert_ne!(first.id(), second.id());
        first.destroy();
        second.destroy();
        Ok(())
    }

    #[test]
    fn input_path_stays_inside_workspace() -> JobResult<()> {
        let workspace = Workspace::create()?;
        let input = workspace.input_path("../../etc/passwd");
        assert_eq!(input, workspace.path().join("passwd"));
        assert!(input.starts_with(workspace.path()));
        workspace.destroy();
        Ok(())
    }

    #[test]
    fn report_path_is_fixed_regardless_of_input_name() -> JobResult<()> {
        let workspace = Workspace::create()?;
        assert_eq!(workspace.report_path(), workspace.path().join("report.pdf"));
        workspace.destroy();
        Ok(())
    }

    #[test]
    fn destroy_removes_directory_and_contents() -> JobResult<()> {
        let workspace = Workspace::create()?;
        let root = workspace.path().to_path_buf();
        std::fs::write(root.join("data.csv"), b"a,b\n1,2\n")
            .map_err(|source| JobError::io("test.write", root.clone(), source))?;
        workspace.destroy();
        assert!(!root.exists());
        Ok(())
    }

    #[test]
    fn drop_backstop_removes_directory() -> JobResult<()> {
        let root = {
            let workspace = Workspace::create()?;
            workspace.path().to_path_buf()
        };
        assert!(!root.exists());
        Ok(())
    }

    #[tokio::test]
    async fn create_input_file_lands_under_sanitised_name() -> JobResult<()> {
        let workspace = Workspace::create()?;
        let (path, file) = workspace.create_input_file("../../etc/passwd").await?;
        drop(file);
        assert_eq!(path, workspace.path().join("passwd"));
        assert!(path.exists());
        workspace.destroy();
        Ok(())
    }
}
