//! Error types for pado-core

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Only support AOCRED/wAR now! Got payment symbol {0:?}")]
    UnsupportedPaymentSymbol(String),

    #[error("Insufficient Balance! Please ensure that your wallet balance is greater than {required} {symbol}")]
    InsufficientBalance { required: u128, symbol: String },

    #[error("Task verification failed: {0}")]
    RemoteVerificationFailure(String),

    #[error("Insufficient number of chosen nodes, expect at least {required}, actual {actual}")]
    InsufficientShares { required: usize, actual: usize },

    #[error("Timed out after {waited:?} waiting for task {task_id} to complete")]
    Timeout { task_id: String, waited: Duration },

    #[error("Wait for task {0} was cancelled")]
    Cancelled(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Invalid access policy: {0}")]
    InvalidPolicy(String),

    #[error("Invalid data record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error("Schema version mismatch: expected v{expected}, got v{actual}")]
    SchemaVersion { expected: u32, actual: u32 },

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap any remote failure without interpreting it
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        Error::Upstream(err.to_string())
    }

    /// Whether the caller can reasonably try the same call again later.
    ///
    /// Only a timed out wait qualifies: the task may still finish remotely.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
