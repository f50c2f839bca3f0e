//! Devnet error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use pado_client::wire::ErrorResponse;

#[derive(Error, Debug)]
pub enum DevnetError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Insufficient Balance! {address} holds {balance} on {token}, needs {amount}")]
    InsufficientBalance {
        token: String,
        address: String,
        balance: u128,
        amount: u128,
    },

    #[error("Task fee not paid: {owner} has {paid} credited, task costs {fee}")]
    FeeNotPaid { owner: String, paid: u128, fee: u128 },

    #[error("Task {0} is already complete")]
    AlreadyComplete(String),

    #[error(transparent)]
    Core(#[from] pado_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for DevnetError {
    fn into_response(self) -> Response {
        let status = match &self {
            DevnetError::NotFound(_) => StatusCode::NOT_FOUND,
            DevnetError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DevnetError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
            DevnetError::FeeNotPaid { .. } => StatusCode::PAYMENT_REQUIRED,
            DevnetError::AlreadyComplete(_) => StatusCode::CONFLICT,
            DevnetError::Core(_) => StatusCode::BAD_REQUEST,
            DevnetError::Json(_) => StatusCode::BAD_REQUEST,
            DevnetError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DevnetError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DevnetError>;
