//! walletgate entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Open the nonce store (Redis, or in-memory for development)
//! 3. Build router with API routes, CORS and response headers
//! 4. Start Axum server

use std::sync::Arc;
use walletgate::{
    auth::middleware::AppState,
    config::{Config, NonceBackend},
    routes,
    storage::{MemoryNonceStore, NonceStore, RedisNonceStore},
};

#[tokio::main]
async fn main() {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting walletgate on {}", config.bind_addr);

    let nonces: Arc<dyn NonceStore> = match config.nonce_backend {
        NonceBackend::Redis => {
            let redis_url = config
                .redis_url
                .as_deref()
                .expect("REDIS_URL is validated by Config::from_env");
            let redis_client = redis::Client::open(redis_url).expect("Invalid Redis URL");

            // Verify Redis connection
            redis_client
                .get_multiplexed_async_connection()
                .await
                .expect("Failed to connect to Redis");

            tracing::info!(prefix = %config.nonce_key_prefix, "Using Redis nonce store");
            Arc::new(RedisNonceStore::new(
                redis_client,
                config.nonce_key_prefix.clone(),
            ))
        }
        NonceBackend::Memory => {
            tracing::warn!("Using in-memory nonce store: nonces reset on restart");
            Arc::new(MemoryNonceStore::new())
        }
    };

    let bind_addr = config.bind_addr;
    let state = AppState {
        nonces,
        config: Arc::new(config),
    };

    let app = routes::app(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
