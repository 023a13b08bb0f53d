//! Validation and parsing helpers for configuration values.

use std::net::SocketAddr;

use crate::error::{ConfigError, ConfigResult};

/// Parse a socket address such as `0.0.0.0:8080`.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` when the value does not parse.
pub fn parse_bind_addr(field: &'static str, value: &str) -> ConfigResult<SocketAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid_field(field, value, "must be a socket address"))
}

/// Split a whitespace-separated argument list, rejecting blank input.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` when the value contains no arguments.
pub fn parse_args(field: &'static str, value: &str) -> ConfigResult<Vec<String>> {
    let args: Vec<String> = value.split_whitespace().map(str::to_string).collect();
    if args.is_empty() {
        return Err(ConfigError::invalid_field(field, value, "must not be blank"));
    }
    Ok(args)
}

/// Require a non-empty trimmed string.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` when the value is empty after
/// trimming.
pub fn parse_non_empty(field: &'static str, value: &str) -> ConfigResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::invalid_field(field, value, "must not be empty"));
    }
    Ok(trimmed.to_string())
}
