//! Shared handler state.

use std::sync::Arc;

use datascribe_job::JobExecutor;
use datascribe_telemetry::Metrics;

/// Immutable dependencies shared by all handlers, wired once at startup.
/// All per-request state lives in the handler call itself.
pub(crate) struct ApiState {
    pub(crate) executor: Arc<dyn JobExecutor>,
    pub(crate) metrics: Metrics,
}

impl ApiState {
    pub(crate) const fn new(executor: Arc<dyn JobExecutor>, metrics: Metrics) -> Self {
        Self { executor, metrics }
    }
}
