//! Prometheus-backed [`EngineMetrics`].

use std::time::Duration;

use engine::{Capability, EngineMetrics, Operation};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and return a handle for `/metrics`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Forwards engine activity to the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusMetrics;

impl EngineMetrics for PrometheusMetrics {
    fn record_capability(&self, dataset: &str, capability: Capability, latency: Duration, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        histogram!(
            "steer_capability_duration_seconds",
            "dataset" => dataset.to_string(),
            "capability" => capability.as_str()
        )
        .record(latency.as_secs_f64());
        counter!(
            "steer_capability_calls_total",
            "dataset" => dataset.to_string(),
            "capability" => capability.as_str(),
            "outcome" => outcome
        )
        .increment(1);
    }

    fn record_points(&self, dataset: &str, operation: Operation, requested: usize, produced: usize) {
        counter!(
            "steer_points_requested_total",
            "dataset" => dataset.to_string(),
            "operation" => operation.as_str()
        )
        .increment(requested as u64);
        counter!(
            "steer_points_produced_total",
            "dataset" => dataset.to_string(),
            "operation" => operation.as_str()
        )
        .increment(produced as u64);
    }

    fn record_store_size(&self, dataset: &str, entries: usize) {
        gauge!("steer_store_entries", "dataset" => dataset.to_string()).set(entries as f64);
    }
}
