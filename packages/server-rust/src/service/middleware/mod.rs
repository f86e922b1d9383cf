//! Tower middleware layers for the dispatch pipeline.
//!
//! - [`timeout`]: Per-request deadline enforcement
//! - [`metrics`]: Request timing and outcome via `tracing` spans
//! - [`load_shed`]: Semaphore-based concurrency limiting
//! - [`pipeline`]: Composes all layers into a single service stack

pub mod load_shed;
pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use load_shed::LoadShedLayer;
pub use metrics::MetricsLayer;
pub use pipeline::{build_handler_pipeline, HandlerPipeline};
pub use timeout::TimeoutLayer;
