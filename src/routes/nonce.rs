//! Nonce query endpoints.
//!
//! Public: a nonce is not secret, only its single use matters.

use crate::auth::middleware::AppState;
use crate::error::AppError;
use crate::models::NonceResponse;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};

/// GET /nonce/{public_key} — Current nonce to embed in the next signed request
pub async fn get_nonce(
    State(state): State<AppState>,
    Path(public_key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let nonce = state.nonces.get_nonce(&public_key).await?;

    tracing::debug!(action = "nonce_query", public_key = %public_key, nonce, "Nonce issued");

    Ok(Json(NonceResponse { nonce }))
}

/// GET /nonce — Public key segment missing
pub async fn missing_public_key() -> AppError {
    AppError::BadRequest("Missing public key".to_string())
}
