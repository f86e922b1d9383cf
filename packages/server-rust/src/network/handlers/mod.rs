//! Axum handlers of the protocol binding.
//!
//! Routes (operation names and tokens are single percent-decoded path segments):
//!
//! | method | path                               | call                   |
//! |--------|------------------------------------|------------------------|
//! | POST   | `/{operation}?callback=`           | start                  |
//! | POST   | `/{operation}/{id}/cancel`         | cancel                 |
//! | GET    | `/{operation}/{id}`                | get info               |
//! | GET    | `/{operation}/{id}/result?wait=`   | get result             |
//! | POST   | `/{operation}/completion`          | map completion         |
//!
//! Completion shares the `/{operation}/{id}` route with get-info, so an
//! operation ID spelled `completion` stays reachable by `GET`.

pub mod operations;
pub mod response;

use std::sync::Arc;

use nexus_core::OperationError;
use tower::util::BoxCloneSyncService;

pub use operations::{
    cancel_operation_handler, get_operation_info_handler, get_operation_result_handler,
    map_completion_handler, start_operation_handler,
};
pub use response::ApiError;

use super::{NetworkConfig, ShutdownController};
use crate::service::{HandlerRequest, HandlerResponse};

/// The dispatch pipeline with its layer types erased.
pub type SharedPipeline = BoxCloneSyncService<HandlerRequest, HandlerResponse, OperationError>;

/// Shared state passed to all axum handlers via `State` extraction.
///
/// Cloning is cheap: the pipeline and everything else are `Arc`-backed, and
/// clones share the pipeline's load-shedding semaphore.
#[derive(Clone)]
pub struct AppState {
    /// Dispatch pipeline wrapping the protocol handler.
    pub pipeline: SharedPipeline,
    pub shutdown: Arc<ShutdownController>,
    pub config: Arc<NetworkConfig>,
}
