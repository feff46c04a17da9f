//! In-process nonce records.

use super::{next_nonce, NonceStore, StoreError};
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};

/// Nonce store backed by a concurrent map.
///
/// State is lost on restart, which also resets every nonce to 0 and
/// reopens replay of earlier requests. Use Redis outside tests and local
/// development.
#[derive(Debug, Default)]
pub struct MemoryNonceStore {
    nonces: DashMap<String, u64>,
}

impl MemoryNonceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NonceStore for MemoryNonceStore {
    async fn get_nonce(&self, public_key: &str) -> Result<u64, StoreError> {
        Ok(self.nonces.get(public_key).map(|n| *n).unwrap_or(0))
    }

    async fn set_nonce(&self, public_key: &str, value: u64) -> Result<(), StoreError> {
        self.nonces.insert(public_key.to_string(), value);
        Ok(())
    }

    async fn advance_nonce(&self, public_key: &str, expected: u64) -> Result<bool, StoreError> {
        let Some(next) = next_nonce(expected) else {
            return Ok(false);
        };
        // The entry guard holds the shard lock across compare and write
        match self.nonces.entry(public_key.to_string()) {
            Entry::Occupied(mut entry) if *entry.get() == expected => {
                entry.insert(next);
                Ok(true)
            }
            Entry::Vacant(entry) if expected == 0 => {
                entry.insert(next);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
