//! Network module with deferred startup lifecycle.
//!
//! `new()` creates resources, `start()` binds the TCP listener, and
//! `serve()` starts accepting connections. Between `start()` and `serve()`
//! the caller knows the bound port (useful with port 0) and may share the
//! shutdown controller with other components.

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use nexus_core::Handler;
use tokio::net::TcpListener;
use tower::util::BoxCloneSyncService;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    cancel_operation_handler, get_operation_info_handler, get_operation_result_handler,
    map_completion_handler, start_operation_handler, AppState,
};
use super::middleware::{build_http_layers, track_in_flight};
use super::shutdown::ShutdownController;
use crate::service::{build_handler_pipeline, ServerConfig};

/// Serves a [`Handler`] over HTTP.
///
/// Follows the deferred startup pattern:
/// 1. `new()` -- builds the dispatch pipeline and shutdown controller
/// 2. `start()` -- binds TCP listener to the configured address
/// 3. `serve()` -- begins accepting connections until shutdown is signalled
pub struct NetworkModule {
    config: NetworkConfig,
    state: AppState,
    listener: Option<TcpListener>,
}

impl NetworkModule {
    /// Creates a new network module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, server: &ServerConfig, handler: Arc<dyn Handler>) -> Self {
        let state = AppState {
            pipeline: BoxCloneSyncService::new(build_handler_pipeline(handler, server)),
            shutdown: Arc::new(ShutdownController::new()),
            config: Arc::new(config.clone()),
        };
        Self {
            config,
            state,
            listener: None,
        }
    }

    /// Returns a shared reference to the shutdown controller.
    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.state.shutdown)
    }

    /// Assembles the axum router with the protocol routes and middleware.
    ///
    /// `POST /{operation}/completion` is served by the parameterised
    /// `/{operation}/{operation_id}` route, so `GET` with any operation ID
    /// (including `completion`) reaches get-info.
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/{operation}", post(start_operation_handler))
            .route(
                "/{operation}/{operation_id}",
                get(get_operation_info_handler).post(map_completion_handler),
            )
            .route(
                "/{operation}/{operation_id}/cancel",
                post(cancel_operation_handler),
            )
            .route(
                "/{operation}/{operation_id}/result",
                get(get_operation_result_handler),
            )
            .route_layer(from_fn_with_state(
                Arc::clone(&self.state.shutdown),
                track_in_flight,
            ))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(build_http_layers(&self.config))
            .with_state(self.state.clone())
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used (OS-assigned ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g., port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();

        info!("TCP listener bound to {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves connections until the shutdown signal fires.
    ///
    /// After the signal:
    /// 1. Health state transitions to Draining and new requests get `UNAVAILABLE`
    /// 2. axum stops accepting and finishes open connections
    /// 3. Waits up to `drain_timeout` for in-flight requests to complete
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, or if the server
    /// encounters a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow::anyhow!("start() must be called before serve()"))?;
        let router = self.build_router();
        let controller = self.shutdown_controller();

        controller.set_ready();
        info!("Serving protocol requests");

        let signal_ctrl = Arc::clone(&controller);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.await;
                signal_ctrl.trigger_shutdown();
            })
            .await?;

        if controller.wait_for_drain(self.config.drain_timeout).await {
            info!("All in-flight requests drained");
        } else {
            warn!(
                in_flight = controller.in_flight_count(),
                "Drain timeout expired with in-flight requests remaining"
            );
        }
        Ok(())
    }
}
