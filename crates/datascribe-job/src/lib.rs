#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Job pipeline core: per-request workspace lifecycle and analyzer
//! invocation.
//!
//! Layout: `workspace.rs` (isolated per-job directories and upload
//! persistence), `runner.rs` (external analyzer invocation with bounded
//! diagnostic capture), `error.rs` (structured errors).

pub mod error;
pub mod runner;
pub mod workspace;

pub use error::{JobError, JobResult};
pub use runner::{AnalyzerRunner, JobExecutor, JobReport};
pub use workspace::{FALLBACK_INPUT_NAME, REPORT_FILE_NAME, Workspace, sanitize_file_name};
