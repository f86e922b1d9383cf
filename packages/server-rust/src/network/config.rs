//! Network configuration for the HTTP binding.

use std::time::Duration;

/// Top-level network configuration for the server.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Bind address for the server.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Maximum time to wait for a request to complete. Should exceed the
    /// longest `wait` a client may ask for on result polls.
    pub request_timeout: Duration,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
    /// Allowed CORS origins.
    pub cors_origins: Vec<String>,
    /// How long `serve` waits for in-flight requests after the shutdown signal.
    pub drain_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 0,
            request_timeout: Duration::from_secs(30),
            max_body_bytes: 4 * 1024 * 1024,
            cors_origins: vec!["*".to_string()],
            drain_timeout: Duration::from_secs(30),
        }
    }
}
