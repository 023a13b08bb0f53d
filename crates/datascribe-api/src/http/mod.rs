//! HTTP surface modules (handlers, wire constants, error mapping).

/// Shared wire constants for the HTTP surface.
pub mod constants;
/// Plain-text response error type and taxonomy mapping.
pub mod errors;
/// Liveness and metrics endpoints.
pub mod health;
/// The upload → analyze → stream pipeline endpoint.
pub mod predict;
