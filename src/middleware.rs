//! Response header, CORS and panic layers.

use crate::error::AppError;
use axum::{
    extract::Request,
    http::{HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{Any, CorsLayer};

/// Cross-origin policy: any origin may call `GET`/`POST`.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Panic handler for `CatchPanicLayer`: a panicking handler or extractor is
/// answered with `AppError::Internal` carrying the panic message.
pub fn panic_response(payload: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let message = if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else {
        "Unhandled error".to_string()
    };

    AppError::Internal(message).into_response()
}

/// Middleware that stamps every response with cache and sniffing headers.
///
/// - **Cache-Control: no-store**: nonce reads go stale after every signed
///   call and must never be served from a cache.
/// - **X-Content-Type-Options: nosniff**: responses are JSON only.
pub async fn response_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );

    response
}
