//! Mock analyzer fixtures and environment probes.
//!
//! The mock analyzer is a POSIX shell script honouring the production
//! calling convention (`--input <path> --output <path>`), so suites exercise
//! the real subprocess boundary without a Python toolchain.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Returns `true` if a POSIX shell is available for subprocess fixtures.
#[must_use]
pub fn sh_available() -> bool {
    Path::new("/bin/sh").exists()
}

/// What the mock analyzer should do when invoked.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Verify the input exists, then write `artifact` to the output path and
    /// exit 0.
    Success {
        /// Bytes the mock writes to the requested output path.
        artifact: Vec<u8>,
    },
    /// Print `diagnostic` to stderr and exit with `code`.
    Failure {
        /// Diagnostic text emitted on stderr. Must not contain the line
        /// `DATASCRIBE_EOF`, which delimits the embedded heredoc.
        diagnostic: String,
        /// Non-zero exit code.
        code: i32,
    },
    /// Exit 0 without writing anything, violating the analyzer contract.
    SuccessWithoutArtifact,
    /// Block well past any test deadline, for cancellation suites.
    Hang,
}

/// An installed mock analyzer script plus the invocation triple for it.
#[derive(Debug)]
pub struct MockAnalyzer {
    /// Program to execute.
    pub program: String,
    /// Leading arguments (the script path).
    pub args: Vec<String>,
    /// Working directory for the invocation.
    pub workdir: PathBuf,
    _dir: TempDir,
}

impl MockAnalyzer {
    /// Write a mock analyzer script into a fresh temp directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the fixture directory or script cannot be
    /// written.
    pub fn install(behavior: &MockBehavior) -> io::Result<Self> {
        let dir = TempDir::with_prefix("datascribe-mock-analyzer-")?;
        let script_path = dir.path().join("analyzer.sh");
        let script = match behavior {
            MockBehavior::Success { artifact } => {
                let artifact_path = dir.path().join("artifact.bin");
                std::fs::write(&artifact_path, artifact)?;
                success_script(&artifact_path, &dir.path().join(INVOCATION_LOG))
            }
            MockBehavior::Failure { diagnostic, code } => format!(
                "cat <<'DATASCRIBE_EOF' >&2\n{diagnostic}\nDATASCRIBE_EOF\nexit {code}\n"
            ),
            MockBehavior::SuccessWithoutArtifact => "exit 0\n".to_string(),
            MockBehavior::Hang => "exec sleep 600\n".to_string(),
        };
        std::fs::write(&script_path, script)?;

        Ok(Self {
            program: "/bin/sh".to_string(),
            args: vec![script_path.display().to_string()],
            workdir: dir.path().to_path_buf(),
            _dir: dir,
        })
    }

    /// Path of the log the success script appends each input path to, one
    /// line per invocation.
    #[must_use]
    pub fn invocation_log(&self) -> PathBuf {
        self.workdir.join(INVOCATION_LOG)
    }
}

const INVOCATION_LOG: &str = "invocations.log";

fn success_script(artifact_path: &Path, log_path: &Path) -> String {
    format!(
        r#"input=""
output=""
while [ "$#" -gt 0 ]; do
  case "$1" in
    --input) input="$2"; shift 2 ;;
    --output) output="$2"; shift 2 ;;
    *) shift 1 ;;
  esac
done
[ -n "$input" ] || {{ echo "missing --input" >&2; exit 64; }}
[ -n "$output" ] || {{ echo "missing --output" >&2; exit 64; }}
[ -f "$input" ] || {{ echo "input not found: $input" >&2; exit 66; }}
echo "$input" >> "{log}"
cp "{artifact}" "$output"
"#,
        log = log_path.display(),
        artifact = artifact_path.display()
    )
}
