//! Prometheus metrics for request orchestration.
//!
//! Metrics are recorded through the `metrics` facade and are free when no
//! recorder is installed. Install [`MetricsExporter`] once per process to
//! collect them in Prometheus text format.
//!
//! # Example
//!
//! ```rust,no_run
//! use composable_requests_runtime::metrics::MetricsExporter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut exporter = MetricsExporter::new();
//! exporter.install()?;
//!
//! // ... run requests ...
//!
//! if let Some(text) = exporter.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus exporter for request metrics.
#[derive(Default)]
pub struct MetricsExporter {
    handle: Option<PrometheusHandle>,
}

impl MetricsExporter {
    /// Exporter that is not installed yet.
    #[must_use]
    pub const fn new() -> Self {
        Self { handle: None }
    }

    /// Builder configured with the request duration buckets.
    ///
    /// # Errors
    ///
    /// Returns error if the bucket configuration is rejected.
    pub fn builder() -> Result<PrometheusBuilder, MetricsError> {
        PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))
    }

    /// Register metric descriptions and install the global recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or a different recorder
    /// is already installed.
    pub fn install(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        match Self::builder()?.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!("Request metrics recorder installed");
                Ok(())
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this exporter did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "requests_dispatched_total",
        "Total number of request actions handled by the orchestrator"
    );
    describe_counter!(
        "requests_succeeded_total",
        "Total number of requests that ended with a success action"
    );
    describe_counter!(
        "requests_failed_total",
        "Total number of requests that ended with an error action"
    );
    describe_counter!(
        "requests_aborted_total",
        "Total number of requests that ended with an abort action"
    );
    describe_counter!(
        "requests_recovered_total",
        "Total number of failed requests recovered by an error interceptor"
    );
    describe_counter!(
        "requests_cancelled_calls_total",
        "Total number of in-flight driver calls cancelled"
    );
    describe_gauge!(
        "requests_pending_keys",
        "Number of dedup keys with driver calls in flight"
    );
    describe_histogram!(
        "request_duration_seconds",
        "Time from request action to terminal action"
    );
}

/// Request lifecycle metrics recorder.
pub struct RequestMetrics;

impl RequestMetrics {
    /// Record a request action entering the pipeline.
    pub fn record_dispatched() {
        counter!("requests_dispatched_total").increment(1);
    }

    /// Record a success action.
    pub fn record_succeeded(duration: Duration) {
        counter!("requests_succeeded_total").increment(1);
        histogram!("request_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an error action.
    pub fn record_failed(duration: Duration) {
        counter!("requests_failed_total").increment(1);
        histogram!("request_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an abort action.
    pub fn record_aborted() {
        counter!("requests_aborted_total").increment(1);
    }

    /// Record a failure recovered by an error interceptor.
    pub fn record_recovered() {
        counter!("requests_recovered_total").increment(1);
    }

    /// Record cancelled driver calls.
    pub fn record_cancelled(calls: usize) {
        if calls > 0 {
            counter!("requests_cancelled_calls_total").increment(calls as u64);
        }
    }

    /// Record the number of keys with calls in flight.
    pub fn record_pending_keys(keys: usize) {
        // Note: Precision loss acceptable for metrics (key counts < 2^52)
        #[allow(clippy::cast_precision_loss)]
        gauge!("requests_pending_keys").set(keys as f64);
    }
}
