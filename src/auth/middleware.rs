//! Axum extractor for wallet-signed requests.

use super::gate::{authorize, Authorized};
use crate::config::Config;
use crate::error::AppError;
use crate::storage::NonceStore;
use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub nonces: Arc<dyn NonceStore>,
    pub config: Arc<Config>,
}

/// Verified signer of the request body.
///
/// Consumes the body, runs the auth gate, and hands the handler the verified
/// identity together with the signed `data`. The nonce has already been
/// advanced when the handler sees this value. Rejections become the error
/// response directly and the handler never runs.
#[derive(Debug, Clone)]
pub struct WalletAuth(pub Authorized);

impl FromRequest<AppState> for WalletAuth {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e, "Failed to read request body");
            AppError::MalformedRequest
        })?;

        let authorized = authorize(state.nonces.as_ref(), &body).await?;
        Ok(WalletAuth(authorized))
    }
}
