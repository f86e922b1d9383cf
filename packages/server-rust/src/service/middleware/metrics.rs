//! Metrics middleware for dispatched requests.
//!
//! Records duration and outcome using `tracing` spans, not a full metrics crate.

use std::task::{Context, Poll};
use std::time::Instant;

use nexus_core::OperationError;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::dispatch::{DispatchFuture, HandlerRequest, HandlerResponse};

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that instruments requests with timing and outcome via `tracing` spans.
#[derive(Debug, Clone)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

/// Outcome label recorded on the span.
fn outcome_of(result: &Result<HandlerResponse, OperationError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(OperationError::Handler(_)) => "handler_error",
        Err(OperationError::Unsuccessful(_)) => "unsuccessful",
        Err(OperationError::StillRunning) => "still_running",
        Err(OperationError::Application(_)) => "error",
    }
}

impl<S> Service<HandlerRequest> for MetricsService<S>
where
    S: Service<HandlerRequest, Response = HandlerResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = HandlerResponse;
    type Error = OperationError;
    type Future = DispatchFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: HandlerRequest) -> Self::Future {
        let operation = req.operation().to_string();
        let method = req.method();

        let span = info_span!(
            "operation",
            operation = %operation,
            method = method,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(req);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = start.elapsed().as_millis() as u64;
                let outcome = outcome_of(&result);

                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);

                tracing::info!(
                    operation = %operation,
                    method = method,
                    duration_ms = duration_ms,
                    outcome = outcome,
                    "operation complete"
                );

                result
            }
            .instrument(span),
        )
    }
}
