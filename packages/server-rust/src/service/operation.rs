//! Typed operation handlers.
//!
//! - [`SyncOperation`]: an async function from input to output, completed
//!   within the start call.
//! - [`AsyncOperation`]: wraps an [`AsyncOperationHandler`] whose start call
//!   returns a token; the outcome is obtained later through that token, and
//!   is shaped by a [`ResultPipeline`] of mappers.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use nexus_core::{
    CancelOperationOptions, GetOperationInfoOptions, GetOperationResultOptions, OperationError,
    OperationInfo, RequestContext, StartOperationOptions,
};
use serde::de::DeserializeOwned;

use super::mapper::{ResultMapper, ResultPipeline};

// ---------------------------------------------------------------------------
// SyncOperation
// ---------------------------------------------------------------------------

type SyncFn<I, O> = dyn Fn(
        RequestContext,
        I,
        StartOperationOptions,
    ) -> BoxFuture<'static, Result<O, OperationError>>
    + Send
    + Sync;

/// An operation that always completes within the start call.
///
/// The function's error becomes the operation's failure; a synchronous
/// operation never reports a pending outcome.
pub struct SyncOperation<I, O> {
    name: String,
    handler: Arc<SyncFn<I, O>>,
}

impl<I, O> SyncOperation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(RequestContext, I, StartOperationOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O, OperationError>> + Send + 'static,
    {
        let handler = move |ctx: RequestContext,
                            input: I,
                            options: StartOperationOptions|
              -> BoxFuture<'static, Result<O, OperationError>> {
            Box::pin(f(ctx, input, options))
        };
        Self {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) async fn call(
        &self,
        ctx: RequestContext,
        input: I,
        options: StartOperationOptions,
    ) -> Result<O, OperationError> {
        (self.handler)(ctx, input, options).await
    }
}

// ---------------------------------------------------------------------------
// AsyncOperationHandler
// ---------------------------------------------------------------------------

/// Application side of an asynchronous operation.
///
/// Only `start` is required; the other methods default to `NotImplemented`.
#[async_trait]
pub trait AsyncOperationHandler: Send + Sync + 'static {
    type Input: DeserializeOwned + Send + 'static;
    /// The handler's own result type, before any mapper runs. Completions
    /// pushed by the execution substrate are decoded into this type.
    type Output: DeserializeOwned + Send + 'static;

    /// Starts the operation and returns its token.
    async fn start(
        &self,
        ctx: &RequestContext,
        input: Self::Input,
        options: StartOperationOptions,
    ) -> Result<String, OperationError>;

    async fn cancel(
        &self,
        ctx: &RequestContext,
        operation_id: &str,
        options: CancelOperationOptions,
    ) -> Result<(), OperationError> {
        let _ = (ctx, operation_id, options);
        Err(OperationError::not_implemented("cancel"))
    }

    /// Returns the result, `Unsuccessful` for a failed or canceled operation,
    /// or `StillRunning`.
    async fn get_result(
        &self,
        ctx: &RequestContext,
        operation_id: &str,
        options: GetOperationResultOptions,
    ) -> Result<Self::Output, OperationError> {
        let _ = (ctx, operation_id, options);
        Err(OperationError::not_implemented("get_result"))
    }

    async fn get_info(
        &self,
        ctx: &RequestContext,
        operation_id: &str,
        options: GetOperationInfoOptions,
    ) -> Result<OperationInfo, OperationError> {
        let _ = (ctx, operation_id, options);
        Err(OperationError::not_implemented("get_info"))
    }
}

// ---------------------------------------------------------------------------
// AsyncOperation
// ---------------------------------------------------------------------------

/// An asynchronous operation: a handler plus the pipeline shaping its output.
///
/// `O` is the declared output. It starts as the handler's own output and
/// changes with every [`AsyncOperation::map_result`] stage.
pub struct AsyncOperation<H: AsyncOperationHandler, O = <H as AsyncOperationHandler>::Output> {
    name: String,
    handler: Arc<H>,
    pipeline: ResultPipeline<H::Output, O>,
}

impl<H: AsyncOperationHandler> AsyncOperation<H, H::Output> {
    pub fn new(name: impl Into<String>, handler: H) -> Self {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
            pipeline: ResultPipeline::identity(),
        }
    }
}

impl<H, O> AsyncOperation<H, O>
where
    H: AsyncOperationHandler,
    O: Send + 'static,
{
    /// Appends a mapper stage to the output pipeline.
    #[must_use]
    pub fn map_result<M>(self, mapper: M) -> AsyncOperation<H, M::Output>
    where
        M: ResultMapper<Input = O>,
    {
        AsyncOperation {
            name: self.name,
            handler: self.handler,
            pipeline: self.pipeline.then(mapper),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    #[must_use]
    pub fn pipeline(&self) -> &ResultPipeline<H::Output, O> {
        &self.pipeline
    }
}
