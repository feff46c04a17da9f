//! API route handlers.

pub mod auth;
pub mod nonce;

use crate::auth::middleware::AppState;
use crate::error::AppError;
use crate::middleware::{cors_layer, panic_response, response_headers};
use axum::{routing::get, routing::post, Router};
use tower_http::catch_panic::CatchPanicLayer;

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Nonce endpoints (public)
        .route("/nonce", get(nonce::missing_public_key))
        .route("/nonce/", get(nonce::missing_public_key))
        .route("/nonce/{public_key}", get(nonce::get_nonce))
        // Wallet-signed endpoints
        .route("/whoami", post(auth::whoami))
}

/// Full application: routes, JSON 404/405 fallbacks, body limit, panic
/// catching, CORS and response headers, bound to `state`.
pub fn app(state: AppState) -> Router {
    with_layers(api_router(), state)
}

fn with_layers(router: Router<AppState>, state: AppState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    router
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(axum::extract::DefaultBodyLimit::max(max_body_bytes))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer())
        .layer(axum::middleware::from_fn(response_headers))
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
