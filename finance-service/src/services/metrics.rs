//! Prometheus export for the finance service.
//!
//! The recorder is process-wide; handlers only ever read it through
//! [`get_metrics`].

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// Must run once at startup before any metric is recorded. Panics if called
/// twice.
pub fn init_metrics() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_authorization(permission: &str, decision: &'static str) {
    counter!(
        "authorization_decisions_total",
        "permission" => permission.to_string(),
        "decision" => decision
    )
    .increment(1);
}

pub fn record_summary(unit: &str, outcome: &'static str) {
    counter!(
        "summary_requests_total",
        "unit" => unit.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}
