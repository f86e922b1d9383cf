//! Load-shedding middleware for dispatched requests.
//!
//! Rejects requests when the server is overloaded (concurrent count exceeds
//! `max_concurrent_operations`) with a `ResourceExhausted` handler error.

use std::sync::Arc;
use std::task::{Context, Poll};

use nexus_core::{HandlerError, HandlerErrorType, OperationError};
use tokio::sync::Semaphore;
use tower::{Layer, Service};

use crate::service::dispatch::{DispatchFuture, HandlerRequest, HandlerResponse};

// ---------------------------------------------------------------------------
// LoadShedLayer
// ---------------------------------------------------------------------------

/// Tower layer that limits concurrent requests via a semaphore.
///
/// When all permits are taken, incoming requests are rejected immediately
/// rather than queued.
#[derive(Debug, Clone)]
pub struct LoadShedLayer {
    semaphore: Arc<Semaphore>,
}

impl LoadShedLayer {
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent as usize)),
        }
    }
}

impl<S> Layer<S> for LoadShedLayer {
    type Service = LoadShedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadShedService {
            inner,
            semaphore: Arc::clone(&self.semaphore),
        }
    }
}

// ---------------------------------------------------------------------------
// LoadShedService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadShedService<S> {
    inner: S,
    semaphore: Arc<Semaphore>,
}

impl<S> Service<HandlerRequest> for LoadShedService<S>
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
        let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() else {
            return Box::pin(async {
                Err(HandlerError::new(
                    HandlerErrorType::ResourceExhausted,
                    "server overloaded, try again later",
                )
                .into())
            });
        };

        let fut = self.inner.call(req);
        Box::pin(async move {
            // Held for the whole call.
            let result = fut.await;
            drop(permit);
            result
        })
    }
}
