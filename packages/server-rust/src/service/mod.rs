//! Operation handling and dispatch.
//!
//! 1. **Typed handlers** (`operation`, `mapper`): sync functions, async handlers, result pipelines
//! 2. **Adapter** (`adapter`): type erasure to `Message`-level calls
//! 3. **Routing** (`router`): `ServiceHandler` dispatches by operation name
//! 4. **Dispatch** (`dispatch`, `middleware`): tower service over the `Handler` trait,
//!    wrapped with load shedding, timeouts and metrics

pub mod adapter;
pub mod config;
pub mod dispatch;
pub mod mapper;
pub mod middleware;
pub mod operation;
pub mod router;

pub use adapter::UntypedOperationHandler;
pub use config::ServerConfig;
pub use dispatch::{HandlerRequest, HandlerResponse, HandlerService};
pub use mapper::{MapOk, ResultMapper, ResultPipeline};
pub use middleware::{build_handler_pipeline, HandlerPipeline};
pub use operation::{AsyncOperation, AsyncOperationHandler, SyncOperation};
pub use router::{ServiceError, ServiceHandler, ServiceHandlerOptions};
