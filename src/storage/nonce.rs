//! Redis-backed nonce records.
//!
//! Redis key pattern:
//! - `{prefix}{public_key}` — current nonce as a decimal string
//!
//! Records are created on first successful authorization and never expire.

use super::{next_nonce, parse_nonce, NonceStore, StoreError};
use async_trait::async_trait;
use redis::AsyncCommands;

/// Lua script for atomic compare-and-set of a nonce.
///
/// Mirrors [`parse_nonce`]: anything other than `0` or a 1-19 digit integer
/// without leading zeros counts as 0.
const ADVANCE_SCRIPT: &str = r"
local raw = redis.call('GET', KEYS[1])
local current = '0'
if raw and #raw <= 19 and (raw == '0' or string.match(raw, '^[1-9]%d*$')) then
    current = raw
end
if current == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2])
    return 1
end
return 0
";

#[derive(Clone)]
pub struct RedisNonceStore {
    client: redis::Client,
    prefix: String,
    advance: redis::Script,
}

impl RedisNonceStore {
    pub fn new(client: redis::Client, prefix: impl Into<String>) -> Self {
        Self {
            client,
            prefix: prefix.into(),
            advance: redis::Script::new(ADVANCE_SCRIPT),
        }
    }

    fn key(&self, public_key: &str) -> String {
        format!("{}{}", self.prefix, public_key)
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, StoreError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Redis connection error: {}", e)))
    }
}

#[async_trait]
impl NonceStore for RedisNonceStore {
    async fn get_nonce(&self, public_key: &str) -> Result<u64, StoreError> {
        let mut con = self.connection().await?;
        // Raw bytes so a non-UTF-8 value reads as malformed instead of failing
        let raw: Option<Vec<u8>> = con.get(self.key(public_key)).await?;
        Ok(match raw {
            Some(bytes) => std::str::from_utf8(&bytes)
                .map(|text| parse_nonce(Some(text)))
                .unwrap_or(0),
            None => 0,
        })
    }

    async fn set_nonce(&self, public_key: &str, value: u64) -> Result<(), StoreError> {
        let mut con = self.connection().await?;
        con.set::<_, _, ()>(self.key(public_key), value.to_string())
            .await?;
        Ok(())
    }

    async fn advance_nonce(&self, public_key: &str, expected: u64) -> Result<bool, StoreError> {
        let Some(next) = next_nonce(expected) else {
            return Ok(false);
        };
        let mut con = self.connection().await?;
        let advanced: i32 = self
            .advance
            .key(self.key(public_key))
            .arg(expected.to_string())
            .arg(next.to_string())
            .invoke_async(&mut con)
            .await?;
        Ok(advanced == 1)
    }
}
