//! Prometheus-backed metrics registry shared across services.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes the handful of counters relevant to the job pipeline.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::error::{TelemetryError, TelemetryResult};

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    jobs_started_total: IntCounter,
    jobs_succeeded_total: IntCounter,
    jobs_failed_total: IntCounter,
    analysis_latency_ms: IntGauge,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built
    /// or registered.
    pub fn new() -> TelemetryResult<Self> {
        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "http_requests_total",
            source,
        })?;
        let jobs_started_total =
            IntCounter::with_opts(Opts::new("jobs_started_total", "Analysis jobs accepted"))
                .map_err(|source| TelemetryError::MetricsCollector {
                    name: "jobs_started_total",
                    source,
                })?;
        let jobs_succeeded_total = IntCounter::with_opts(Opts::new(
            "jobs_succeeded_total",
            "Analysis jobs that produced an artifact",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "jobs_succeeded_total",
            source,
        })?;
        let jobs_failed_total = IntCounter::with_opts(Opts::new(
            "jobs_failed_total",
            "Analysis jobs that terminated in an error",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "jobs_failed_total",
            source,
        })?;
        let analysis_latency_ms = IntGauge::with_opts(Opts::new(
            "analysis_latency_ms",
            "Wall-clock duration of the most recent analyzer invocation (ms)",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "analysis_latency_ms",
            source,
        })?;

        let registry = Registry::new();
        register(&registry, "http_requests_total", http_requests_total.clone())?;
        register(&registry, "jobs_started_total", jobs_started_total.clone())?;
        register(
            &registry,
            "jobs_succeeded_total",
            jobs_succeeded_total.clone(),
        )?;
        register(&registry, "jobs_failed_total", jobs_failed_total.clone())?;
        register(&registry, "analysis_latency_ms", analysis_latency_ms.clone())?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                jobs_started_total,
                jobs_succeeded_total,
                jobs_failed_total,
                analysis_latency_ms,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Record a job entering the pipeline.
    pub fn inc_job_started(&self) {
        self.inner.jobs_started_total.inc();
    }

    /// Record a job that produced its artifact.
    pub fn inc_job_succeeded(&self) {
        self.inner.jobs_succeeded_total.inc();
    }

    /// Record a job that terminated in an error.
    pub fn inc_job_failed(&self) {
        self.inner.jobs_failed_total.inc();
    }

    /// Record the wall-clock duration of the latest analyzer invocation.
    pub fn observe_analysis_latency(&self, duration: Duration) {
        self.inner
            .analysis_latency_ms
            .set(duration_to_ms(duration));
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }
}

fn register<C>(registry: &Registry, name: &'static str, collector: C) -> TelemetryResult<()>
where
    C: prometheus::core::Collector + 'static,
{
    registry
        .register(Box::new(collector))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

/// Convert a duration to milliseconds saturating at `i64::MAX`.
fn duration_to_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
