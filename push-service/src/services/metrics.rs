//! Metrics collection for push-service.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::models::BatchReport;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = METRICS_HANDLE.set(handle);
        }
        Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record the outcome counts of one completed batch.
pub fn record_batch(provider: &'static str, report: &BatchReport) {
    counter!("push_batches_total", "provider" => provider).increment(1);
    counter!("push_messages_total", "provider" => provider, "status" => "success")
        .increment(report.success_count as u64);
    counter!("push_messages_total", "provider" => provider, "status" => "failure")
        .increment(report.failure_count as u64);
}
