use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ports::RepositoryError;

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Merchant configuration unavailable: {0}")]
    ConfigurationUnavailable(String),

    #[error("Transaction not found: {0}")]
    NotFound(String),

    #[error("Signature verification failed")]
    InvalidSignature,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Duplicate transaction id")]
    DuplicateId,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PaymentError {
    fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::InvalidAmount(_)
            | PaymentError::UnsupportedProvider(_)
            | PaymentError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
            PaymentError::InvalidSignature => StatusCode::UNAUTHORIZED,
            PaymentError::ConfigurationUnavailable(_)
            | PaymentError::DuplicateId
            | PaymentError::Storage(_)
            | PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for PaymentError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateId(_) => PaymentError::DuplicateId,
            RepositoryError::NotFound(id) => PaymentError::NotFound(id),
            RepositoryError::Storage(msg) => PaymentError::Storage(msg),
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
