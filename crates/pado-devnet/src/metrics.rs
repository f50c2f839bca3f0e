//! Prometheus metrics for the devnet gateway

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::error::{DevnetError, Result};

pub fn record_request(route: &str, status: u16, duration: Duration) {
    counter!("devnet_requests_total", "route" => route.to_string(), "status" => status.to_string()).increment(1);
    histogram!("devnet_request_duration_seconds", "route" => route.to_string()).record(duration.as_secs_f64());
}

pub fn record_registration() {
    counter!("devnet_records_registered_total").increment(1);
}

pub fn record_transfer(ok: bool) {
    let outcome = if ok { "ok" } else { "insufficient_balance" };
    counter!("devnet_transfers_total", "outcome" => outcome).increment(1);
}

pub fn record_task(event: &'static str) {
    counter!("devnet_tasks_total", "event" => event).increment(1);
}

pub fn set_pending_tasks(pending: usize) {
    gauge!("devnet_pending_tasks").set(pending as f64);
}

/// Install the global Prometheus recorder
///
/// Fails if a recorder is already installed in this process.
pub fn init_prometheus_recorder() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| DevnetError::Internal(format!("failed to install Prometheus recorder: {}", e)))
}
