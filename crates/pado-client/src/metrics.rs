//! Client-side metrics
//!
//! Emitted through the `metrics` facade; nothing is recorded unless the
//! embedding application installs a recorder. Labels carry the payment
//! symbol and outcome only, never data or task ids.

use std::time::Duration;

use metrics::{counter, histogram};

use pado_core::{Error, PaymentSymbol};

pub const OUTCOME_OK: &str = "ok";
pub const OUTCOME_TIMEOUT: &str = "timeout";
pub const OUTCOME_CANCELLED: &str = "cancelled";
pub const OUTCOME_REJECTED: &str = "rejected";
pub const OUTCOME_ERROR: &str = "error";

pub fn record_polls(polls: u64, elapsed: Duration) {
    counter!("pado_task_polls_total").increment(polls);
    histogram!("pado_task_wait_seconds").record(elapsed.as_secs_f64());
}

pub fn record_task_submitted(symbol: PaymentSymbol, fee: u128) {
    counter!("pado_tasks_submitted_total", "symbol" => symbol.as_str()).increment(1);
    histogram!("pado_task_fee", "symbol" => symbol.as_str()).record(fee as f64);
}

/// A fee transfer went through but no task was created for it
pub fn record_unmatched_transfer(symbol: PaymentSymbol) {
    counter!("pado_unmatched_transfers_total", "symbol" => symbol.as_str()).increment(1);
}

pub fn record_data_registered(storage_type: &str) {
    counter!("pado_data_registered_total", "storage" => storage_type.to_string()).increment(1);
}

pub fn record_retrieval<T>(result: &pado_core::Result<T>, duration: Duration) {
    let outcome = match result {
        Ok(_) => OUTCOME_OK,
        Err(Error::Timeout { .. }) => OUTCOME_TIMEOUT,
        Err(Error::Cancelled(_)) => OUTCOME_CANCELLED,
        Err(Error::RemoteVerificationFailure(_)) => OUTCOME_REJECTED,
        Err(_) => OUTCOME_ERROR,
    };
    counter!("pado_retrievals_total", "outcome" => outcome).increment(1);
    histogram!("pado_retrieval_duration_seconds", "outcome" => outcome)
        .record(duration.as_secs_f64());
}
