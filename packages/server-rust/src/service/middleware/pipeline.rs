//! Pipeline composition: combines all middleware layers into a single service stack.

use std::sync::Arc;

use nexus_core::Handler;
use tower::ServiceBuilder;

use super::load_shed::{LoadShedLayer, LoadShedService};
use super::metrics::{MetricsLayer, MetricsService};
use super::timeout::{TimeoutLayer, TimeoutService};
use crate::service::config::ServerConfig;
use crate::service::dispatch::HandlerService;

/// The composed dispatch stack returned by [`build_handler_pipeline`].
///
/// Cheap to clone; clones share the load-shedding semaphore.
pub type HandlerPipeline<H> = LoadShedService<TimeoutService<MetricsService<HandlerService<H>>>>;

/// Wraps a [`Handler`] with the dispatch middleware.
///
/// Layer order (outermost to innermost):
/// 1. `LoadShedLayer` -- reject when overloaded (fail fast before doing any work)
/// 2. `TimeoutLayer` -- enforce the per-request deadline
/// 3. `MetricsLayer` -- record timing and outcome (closest to the handler)
#[must_use]
pub fn build_handler_pipeline<H>(handler: Arc<H>, config: &ServerConfig) -> HandlerPipeline<H>
where
    H: Handler + ?Sized + 'static,
{
    ServiceBuilder::new()
        .layer(LoadShedLayer::new(config.max_concurrent_operations))
        .layer(TimeoutLayer::new(config.default_operation_timeout))
        .layer(MetricsLayer)
        .service(HandlerService::new(handler))
}
