use std::time::Duration;

/// Server-level configuration for the dispatch pipeline.
///
/// Controls the per-request deadline and the concurrency limit applied in
/// front of the service handler.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deadline applied to every dispatched request. A caller-supplied
    /// deadline that is earlier wins.
    pub default_operation_timeout: Duration,
    /// Maximum number of concurrent requests before load shedding.
    pub max_concurrent_operations: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_operation_timeout: Duration::from_secs(30),
            max_concurrent_operations: 1000,
        }
    }
}
