//! Nexus server: typed operation handlers, a name-routed service handler,
//! a tower dispatch pipeline, and an axum HTTP binding.

pub mod network;
pub mod service;
pub mod telemetry;

pub use network::{NetworkConfig, NetworkModule, ShutdownController};
pub use service::{
    build_handler_pipeline, AsyncOperation, AsyncOperationHandler, HandlerPipeline, MapOk,
    ResultMapper, ResultPipeline, ServerConfig, ServiceError, ServiceHandler,
    ServiceHandlerOptions, SyncOperation, UntypedOperationHandler,
};
pub use telemetry::{init_tracing, LogFormat};
