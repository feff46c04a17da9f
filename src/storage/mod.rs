//! Nonce storage layer.
//!
//! The auth gate only talks to storage through [`NonceStore`]. Two backends
//! are provided: Redis for deployments and an in-process map for tests and
//! single-node development.

pub mod memory;
pub mod nonce;

pub use memory::MemoryNonceStore;
pub use nonce::RedisNonceStore;

use async_trait::async_trait;

/// Longest stored value still read as a nonce. Keeps the Rust parser and the
/// Redis compare-and-set script in agreement without overflow handling.
pub const MAX_NONCE_DIGITS: usize = 19;

/// Largest nonce that can be stored.
pub const MAX_NONCE: u64 = 9_999_999_999_999_999_999;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("nonce store unavailable: {0}")]
    Unavailable(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(format!("Redis error: {}", err))
    }
}

/// Per-public-key nonce storage.
///
/// Absent and malformed records both read as 0. Only the auth gate writes,
/// and it does so through [`NonceStore::advance_nonce`] so that two requests
/// carrying the same nonce cannot both pass.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Current nonce for `public_key`, 0 if unseen.
    async fn get_nonce(&self, public_key: &str) -> Result<u64, StoreError>;

    /// Overwrite the nonce for `public_key`.
    async fn set_nonce(&self, public_key: &str, value: u64) -> Result<(), StoreError>;

    /// Atomically replace `expected` with `expected + 1`.
    ///
    /// Returns `false` without writing if the stored value is not `expected`.
    async fn advance_nonce(&self, public_key: &str, expected: u64) -> Result<bool, StoreError>;
}

/// Parse a raw stored value.
///
/// Accepts `0` or a decimal integer without sign or leading zeros, up to
/// [`MAX_NONCE_DIGITS`] digits. Anything else is treated as 0.
pub fn parse_nonce(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else {
        return 0;
    };
    if raw.is_empty()
        || raw.len() > MAX_NONCE_DIGITS
        || !raw.bytes().all(|b| b.is_ascii_digit())
        || (raw.len() > 1 && raw.starts_with('0'))
    {
        return 0;
    }
    raw.parse().unwrap_or(0)
}

/// The value `advance_nonce` writes after `expected`, if it is storable.
pub fn next_nonce(expected: u64) -> Option<u64> {
    if expected >= MAX_NONCE {
        None
    } else {
        Some(expected + 1)
    }
}
