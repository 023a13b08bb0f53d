//! External analyzer invocation.
//!
//! The analyzer is an opaque command with a fixed two-path calling
//! convention: `<program> <args…> --input <input> --output <output>`. It runs
//! from the configured working directory so a co-located script resolves
//! independently of request concurrency. No timeout is applied; a hung
//! analyzer blocks its handling task until natural completion. The
//! cancellation token is the seam where an admission bound or deadline can be
//! attached later without changing the call signature.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use datascribe_config::AnalyzerConfig;
use tokio::io::{AsyncReadExt, copy, sink};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{JobError, JobResult};

/// Cap on captured analyzer stderr. Anything beyond it is drained and
/// discarded so the child never blocks on a full pipe.
pub const MAX_DIAGNOSTIC_BYTES: u64 = 64 * 1024;

/// Outcome of a successful analyzer invocation.
#[derive(Debug, Clone, Copy)]
pub struct JobReport {
    /// Wall-clock duration of the invocation.
    pub duration: Duration,
}

/// Seam for invoking the external analysis step, kept as a trait so HTTP
/// tests can substitute a stub executor.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    /// Run the analyzer against `input`, expecting the artifact at `output`.
    ///
    /// # Errors
    ///
    /// Returns a `JobError` when the analyzer cannot be launched, exits
    /// non-zero, or the run is cancelled.
    async fn run(
        &self,
        input: &Path,
        output: &Path,
        cancel: CancellationToken,
    ) -> JobResult<JobReport>;
}

/// Production executor invoking the configured external command.
#[derive(Debug, Clone)]
pub struct AnalyzerRunner {
    analyzer: AnalyzerConfig,
}

impl AnalyzerRunner {
    /// Build a runner around the configured analyzer command.
    #[must_use]
    pub const fn new(analyzer: AnalyzerConfig) -> Self {
        Self { analyzer }
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.analyzer.program);
        command
            .args(&self.analyzer.args)
            .arg("--input")
            .arg(input)
            .arg("--output")
            .arg(output)
            .current_dir(&self.analyzer.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // An abandoned request must not stop a running analysis.
            .kill_on_drop(false);
        command
    }
}

#[async_trait]
impl JobExecutor for AnalyzerRunner {
    async fn run(
        &self,
        input: &Path,
        output: &Path,
        cancel: CancellationToken,
    ) -> JobResult<JobReport> {
        let started = Instant::now();
        let mut child = self
            .command(input, output)
            .spawn()
            .map_err(|source| JobError::Spawn {
                program: self.analyzer.program.clone(),
                source,
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let outcome = tokio::select! {
            () = cancel.cancelled() => None,
            outcome = supervise(&mut child, stdout, stderr) => Some(outcome),
        };

        let Some(outcome) = outcome else {
            if let Err(err) = child.start_kill() {
                warn!(error = %err, "failed to kill analyzer after cancellation");
            }
            let _ = child.wait().await;
            return Err(JobError::Cancelled);
        };

        let (status, diagnostics) = outcome.map_err(|source| {
            JobError::io("analyzer.wait", self.analyzer.workdir.clone(), source)
        })?;
        let duration = started.elapsed();

        if !status.success() {
            return Err(JobError::Analyzer {
                status: status.code(),
                diagnostics,
            });
        }

        info!(
            duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            "analysis finished"
        );
        Ok(JobReport { duration })
    }
}

/// Wait for the child while concurrently consuming both pipes, so neither
/// stream can fill its buffer and stall the analyzer.
async fn supervise(
    child: &mut Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
) -> std::io::Result<(std::process::ExitStatus, String)> {
    let (diagnostics, (), status) = tokio::join!(
        capture_stderr(stderr),
        drain_stdout(stdout),
        child.wait(),
    );
    Ok((status?, diagnostics))
}

async fn capture_stderr(stderr: Option<ChildStderr>) -> String {
    let Some(stderr) = stderr else {
        return String::new();
    };
    let mut limited = stderr.take(MAX_DIAGNOSTIC_BYTES);
    let mut buffer = Vec::new();
    if let Err(err) = limited.read_to_end(&mut buffer).await {
        warn!(error = %err, "failed to read analyzer stderr");
    }
    let mut rest = limited.into_inner();
    if let Err(err) = copy(&mut rest, &mut sink()).await {
        warn!(error = %err, "failed to drain analyzer stderr");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

async fn drain_stdout(stdout: Option<ChildStdout>) {
    let Some(stdout) = stdout else {
        return;
    };
    let mut limited = stdout.take(MAX_DIAGNOSTIC_BYTES);
    let mut buffer = Vec::new();
    if let Err(err) = limited.read_to_end(&mut buffer).await {
        warn!(error = %err, "failed to read analyzer stdout");
    }
    let mut rest = limited.into_inner();
    if let Err(err) = copy(&mut rest, &mut sink()).await {
        warn!(error = %err, "failed to drain analyzer stdout");
    }
    if !buffer.is_empty() {
        debug!(output = %String::from_utf8_lossy(&buffer), "analyzer stdout");
    }
}
