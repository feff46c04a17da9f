//! Wallet-signed API endpoints.

use crate::auth::middleware::WalletAuth;
use crate::error::AppError;
use crate::models::WhoamiResponse;
use axum::{response::IntoResponse, Json};

/// POST /whoami — Echo the verified signer and the payload it signed
pub async fn whoami(WalletAuth(auth): WalletAuth) -> Result<impl IntoResponse, AppError> {
    tracing::info!(action = "whoami", public_key = %auth.public_key, "Identity confirmed");

    Ok(Json(WhoamiResponse {
        public_key: auth.public_key,
        address: auth.address,
        nonce: auth.claim.nonce,
        data: auth.data,
    }))
}
