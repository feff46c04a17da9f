//! Error types and Axum response conversions.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::storage::StoreError;

/// Application error types.
///
/// Every rejection the auth gate can produce is one of these variants, so the
/// route layer only has to map them to a status code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid body")]
    MalformedRequest,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized. Invalid nonce.")]
    NonceMismatch,

    #[error("Unauthorized. Invalid signature.")]
    SignatureInvalid,

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedRequest | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NonceMismatch | AppError::SignatureInvalid => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::StorageUnavailable(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::StorageUnavailable(detail) => {
                // Connection details stay in the server log
                tracing::error!(error = %detail, "Nonce store unavailable");
                "Storage unavailable".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                msg.clone()
            }
            AppError::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AppError::StorageUnavailable(msg),
        }
    }
}
