//! Typed configuration models for the `DataScribe` service.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use serde::Serialize;

/// Default HTTP listen address.
pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);

/// Default analyzer interpreter.
pub const DEFAULT_ANALYZER_PROGRAM: &str = "python3";

/// Default analyzer entry script, resolved relative to the analyzer workdir.
pub const DEFAULT_ANALYZER_SCRIPT: &str = "predict.py";

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    /// Socket address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
    /// External analyzer invocation settings.
    pub analyzer: AnalyzerConfig,
}

/// Invocation settings for the external analysis command.
///
/// The effective command line is
/// `<program> <args…> --input <input> --output <output>`, executed with the
/// working directory set to `workdir` so a co-located script resolves
/// independently of request concurrency or client-controlled paths.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzerConfig {
    /// Program to execute (interpreter or binary).
    pub program: String,
    /// Leading arguments placed before the input/output parameters.
    pub args: Vec<String>,
    /// Working directory for the analyzer process.
    pub workdir: PathBuf,
}

impl AnalyzerConfig {
    /// Analyzer configuration for the standard deployment: a Python script
    /// co-located with the service executable.
    #[must_use]
    pub fn with_workdir(workdir: PathBuf) -> Self {
        Self {
            program: DEFAULT_ANALYZER_PROGRAM.to_string(),
            args: vec![DEFAULT_ANALYZER_SCRIPT.to_string()],
            workdir,
        }
    }
}

/// Directory holding the service executable, used as the default analyzer
/// working directory so the co-located script resolves reliably.
#[must_use]
pub fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
