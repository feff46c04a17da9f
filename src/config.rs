use std::env;
use std::net::SocketAddr;

/// Where nonce records live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceBackend {
    Redis,
    Memory,
}

impl std::str::FromStr for NonceBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "redis" => Ok(NonceBackend::Redis),
            "memory" => Ok(NonceBackend::Memory),
            _ => Err(format!("expected 'redis' or 'memory', got '{}'", s)),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    // Server
    pub bind_addr: SocketAddr,
    pub max_body_bytes: usize,

    // Nonce storage
    pub nonce_backend: NonceBackend,
    pub redis_url: Option<String>,
    pub nonce_key_prefix: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("nonce_backend", &self.nonce_backend)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("nonce_key_prefix", &self.nonce_key_prefix)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        let max_body_bytes: usize = parse_env_or_default("MAX_BODY_BYTES", 1_048_576)?;
        if max_body_bytes == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_BODY_BYTES".to_string(),
                "must be greater than 0".to_string(),
            ));
        }

        // Nonce storage
        let nonce_backend = env::var("NONCE_STORE")
            .unwrap_or_else(|_| "redis".to_string())
            .parse::<NonceBackend>()
            .map_err(|e| ConfigError::InvalidValue("NONCE_STORE".to_string(), e))?;

        // Redis is required for the redis backend; a silent fallback to memory
        // would reset every nonce on restart
        let redis_url = match env::var("REDIS_URL") {
            Ok(url) if !url.is_empty() => Some(url),
            _ => None,
        };
        if nonce_backend == NonceBackend::Redis && redis_url.is_none() {
            return Err(ConfigError::MissingVar("REDIS_URL".to_string()));
        }

        let nonce_key_prefix = env::var("NONCE_KEY_PREFIX").unwrap_or_else(|_| "nonce:".to_string());

        Ok(Config {
            bind_addr,
            max_body_bytes,
            nonce_backend,
            redis_url,
            nonce_key_prefix,
        })
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Config {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            max_body_bytes: 1_048_576,
            nonce_backend: NonceBackend::Memory,
            redis_url: None,
            nonce_key_prefix: "nonce:".to_string(),
        }
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}
