//! Timeout middleware for dispatched requests.
//!
//! Tightens each request's deadline to the configured default, cancels the
//! request context when the deadline passes, and answers `UpstreamTimeout`.

use std::task::{Context, Poll};
use std::time::Duration;

use nexus_core::{HandlerError, HandlerErrorType, OperationError};
use tokio::time::Instant;
use tower::{Layer, Service};

use crate::service::dispatch::{DispatchFuture, HandlerRequest, HandlerResponse};

// ---------------------------------------------------------------------------
// TimeoutLayer
// ---------------------------------------------------------------------------

/// Tower layer enforcing a per-request deadline.
///
/// A caller deadline that is earlier than `now + timeout` is kept.
#[derive(Debug, Clone)]
pub struct TimeoutLayer {
    timeout: Duration,
}

impl TimeoutLayer {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl<S> Layer<S> for TimeoutLayer {
    type Service = TimeoutService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TimeoutService {
            inner,
            timeout: self.timeout,
        }
    }
}

// ---------------------------------------------------------------------------
// TimeoutService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TimeoutService<S> {
    inner: S,
    timeout: Duration,
}

impl<S> Service<HandlerRequest> for TimeoutService<S>
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

    fn call(&mut self, mut req: HandlerRequest) -> Self::Future {
        // A child context, so expiry cancels this call but not the caller's other work.
        let ctx = req.ctx().child().with_timeout(self.timeout);
        let deadline = ctx.deadline().unwrap_or_else(|| Instant::now() + self.timeout);
        *req.ctx_mut() = ctx.clone();

        let fut = self.inner.call(req);
        Box::pin(async move {
            match tokio::time::timeout_at(deadline, fut).await {
                Ok(result) => result,
                Err(_elapsed) => {
                    ctx.cancel();
                    Err(HandlerError::new(
                        HandlerErrorType::UpstreamTimeout,
                        "request deadline exceeded",
                    )
                    .into())
                }
            }
        })
    }
}
