//! Boot sequence: resolve configuration, install telemetry, wire the
//! analyzer runner into the API server, and serve until shutdown.

use std::sync::Arc;

use datascribe_api::ApiServer;
use datascribe_config::AppConfig;
use datascribe_job::AnalyzerRunner;
use datascribe_telemetry::{LoggingConfig, Metrics, init_logging};
use tracing::info;

use crate::error::{AppError, AppResult};

/// Entry point for the `DataScribe` boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, telemetry, or the API listener fails
/// to come up, or if the server terminates unexpectedly.
pub async fn run_app() -> AppResult<()> {
    init_logging(&LoggingConfig::default())
        .map_err(|err| AppError::telemetry("telemetry.init", err))?;

    let config = datascribe_config::load_from_env()
        .map_err(|err| AppError::config("config.load", err))?;
    info!(
        bind_addr = %config.bind_addr,
        analyzer = %config.analyzer.program,
        workdir = %config.analyzer.workdir.display(),
        "DataScribe bootstrap starting"
    );

    let metrics = Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;
    let api = build_server(&config, metrics);

    api.serve(config.bind_addr)
        .await
        .map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("api server shutdown complete");
    Ok(())
}

/// Assemble the API server from resolved configuration.
fn build_server(config: &AppConfig, metrics: Metrics) -> ApiServer {
    let runner = AnalyzerRunner::new(config.analyzer.clone());
    ApiServer::new(Arc::new(runner), metrics)
}
