//! Environment resolution with defaults for the standard deployment.

use std::path::PathBuf;

use crate::error::ConfigResult;
use crate::model::{AnalyzerConfig, AppConfig, DEFAULT_BIND_ADDR, install_dir};
use crate::validate::{parse_args, parse_bind_addr, parse_non_empty};

/// Bind address override.
pub const ENV_BIND_ADDR: &str = "DATASCRIBE_BIND_ADDR";
/// Analyzer program override.
pub const ENV_ANALYZER_PROGRAM: &str = "DATASCRIBE_ANALYZER_PROGRAM";
/// Analyzer leading-args override (whitespace separated).
pub const ENV_ANALYZER_ARGS: &str = "DATASCRIBE_ANALYZER_ARGS";
/// Analyzer working directory override.
pub const ENV_ANALYZER_DIR: &str = "DATASCRIBE_ANALYZER_DIR";

/// Resolve the service configuration from process environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` when an override is present but malformed;
/// unset variables fall back to defaults.
pub fn load_from_env() -> ConfigResult<AppConfig> {
    load_with(|name| std::env::var(name).ok())
}

/// Resolve configuration from an arbitrary lookup, primarily for tests.
///
/// # Errors
///
/// Returns a `ConfigError` when an override is present but malformed.
pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<AppConfig> {
    let bind_addr = match lookup(ENV_BIND_ADDR) {
        Some(raw) => parse_bind_addr("bind_addr", &raw)?,
        None => DEFAULT_BIND_ADDR,
    };

    let workdir = lookup(ENV_ANALYZER_DIR).map_or_else(install_dir, PathBuf::from);
    let mut analyzer = AnalyzerConfig::with_workdir(workdir);

    if let Some(raw) = lookup(ENV_ANALYZER_PROGRAM) {
        analyzer.program = parse_non_empty("analyzer_program", &raw)?;
    }
    if let Some(raw) = lookup(ENV_ANALYZER_ARGS) {
        analyzer.args = parse_args("analyzer_args", &raw)?;
    }

    Ok(AppConfig {
        bind_addr,
        analyzer,
    })
}
