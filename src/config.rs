use std::env;

use tracing::warn;

/// Default number of upstream chunks the relay channel holds before the pump
/// waits for the response writer.
pub const DEFAULT_RELAY_CAPACITY: usize = 32;

/// Trait for types that can retrieve their configuration key from environment variables
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// Find the API key by checking environment variables first, then .env file
    fn find_key() -> Option<String> {
        // First try to load .env file (silently fail if not found)
        let _ = dotenvy::dotenv();

        env::var(Self::KEY_NAME).ok().filter(|key| !key.is_empty())
    }

    /// Like `find_key`, but an absent key is only a warning. Calls made with an
    /// empty key are rejected by the upstream service.
    fn find_key_or_warn() -> String {
        Self::find_key().unwrap_or_else(|| {
            warn!(key = Self::KEY_NAME, "API key not set; upstream calls will fail");
            String::new()
        })
    }
}

/// Listener settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub relay_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            relay_capacity: DEFAULT_RELAY_CAPACITY,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
