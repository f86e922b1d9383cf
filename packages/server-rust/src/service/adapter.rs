//! Type erasure between the typed operation handlers and the router.
//!
//! [`UntypedOperationHandler`] speaks [`Message`]s. The impls for
//! [`SyncOperation`] and [`AsyncOperation`] close over the concrete input and
//! output types, decode and encode through the [`Codec`] passed in by the
//! router, and classify application errors before they leave the adapter.

use async_trait::async_trait;
use nexus_core::{
    CancelOperationRequest, Codec, Failure, GetOperationInfoRequest, GetOperationResultRequest,
    HandlerError, HandlerErrorType, MapCompletionRequest, Message, OperationCompletion,
    OperationError, OperationInfo, RequestContext, StartOperationRequest, StartOperationResponse,
    UnsuccessfulOperationError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::operation::{AsyncOperation, AsyncOperationHandler, SyncOperation};

/// A named operation as seen by the router.
///
/// Every method defaults to `NotImplemented`.
#[async_trait]
pub trait UntypedOperationHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn start_operation(
        &self,
        ctx: &RequestContext,
        codec: &Codec,
        request: StartOperationRequest,
    ) -> Result<StartOperationResponse, OperationError> {
        let _ = (ctx, codec, request);
        Err(OperationError::not_implemented("start_operation"))
    }

    async fn cancel_operation(
        &self,
        ctx: &RequestContext,
        codec: &Codec,
        request: CancelOperationRequest,
    ) -> Result<(), OperationError> {
        let _ = (ctx, codec, request);
        Err(OperationError::not_implemented("cancel_operation"))
    }

    async fn get_operation_info(
        &self,
        ctx: &RequestContext,
        codec: &Codec,
        request: GetOperationInfoRequest,
    ) -> Result<OperationInfo, OperationError> {
        let _ = (ctx, codec, request);
        Err(OperationError::not_implemented("get_operation_info"))
    }

    async fn get_operation_result(
        &self,
        ctx: &RequestContext,
        codec: &Codec,
        request: GetOperationResultRequest,
    ) -> Result<Message, OperationError> {
        let _ = (ctx, codec, request);
        Err(OperationError::not_implemented("get_operation_result"))
    }

    async fn map_completion(
        &self,
        ctx: &RequestContext,
        codec: &Codec,
        request: MapCompletionRequest,
    ) -> Result<OperationCompletion, OperationError> {
        let _ = (ctx, codec, request);
        Err(OperationError::not_implemented("map_completion"))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn decode_input<T>(
    ctx: &RequestContext,
    codec: &Codec,
    input: Message,
) -> Result<T, OperationError>
where
    T: DeserializeOwned + Send + 'static,
{
    let decoded = ctx.run(async { codec.decode::<T>(input) }).await?;
    decoded.map_err(|e| HandlerError::bad_request(format!("invalid input: {e}")).into())
}

async fn encode_output<T>(
    ctx: &RequestContext,
    codec: &Codec,
    output: &T,
) -> Result<Message, OperationError>
where
    T: Serialize + Send + Sync + 'static,
{
    let encoded = ctx.run(async { codec.encode(output) }).await?;
    encoded.map_err(|e| HandlerError::internal(format!("failed to encode output: {e}")).into())
}

fn failure_of(codec: &Codec, error: &anyhow::Error) -> Failure {
    codec
        .to_failure(error)
        .unwrap_or_else(|_| Failure::new(format!("{error:#}")))
}

/// On the outcome paths an unclassified application error is the operation's failure.
fn as_outcome(codec: &Codec, err: OperationError) -> OperationError {
    match err {
        OperationError::Application(error) => {
            UnsuccessfulOperationError::failed(failure_of(codec, &error)).into()
        }
        other => other,
    }
}

/// On the control paths an unclassified application error is an internal fault.
fn as_control(codec: &Codec, err: OperationError) -> OperationError {
    match err {
        OperationError::Application(error) => {
            HandlerError::with_failure(HandlerErrorType::Internal, failure_of(codec, &error)).into()
        }
        other => other,
    }
}

// ---------------------------------------------------------------------------
// SyncOperation
// ---------------------------------------------------------------------------

#[async_trait]
impl<I, O> UntypedOperationHandler for SyncOperation<I, O>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        SyncOperation::name(self)
    }

    async fn start_operation(
        &self,
        ctx: &RequestContext,
        codec: &Codec,
        request: StartOperationRequest,
    ) -> Result<StartOperationResponse, OperationError> {
        let input: I = decode_input(ctx, codec, request.input).await?;
        let output = ctx
            .run(self.call(ctx.clone(), input, request.options))
            .await?
            .map_err(|e| as_outcome(codec, e))?;
        let message = encode_output(ctx, codec, &output).await?;
        Ok(StartOperationResponse::Sync(message))
    }
}

// ---------------------------------------------------------------------------
// AsyncOperation
// ---------------------------------------------------------------------------

impl<H, O> AsyncOperation<H, O>
where
    H: AsyncOperationHandler,
    O: Serialize + Send + Sync + 'static,
{
    /// Runs a handler outcome through the pipeline and encodes the declared output.
    async fn finish(
        &self,
        ctx: &RequestContext,
        codec: &Codec,
        outcome: Result<H::Output, OperationError>,
    ) -> Result<Message, OperationError> {
        let input = match outcome {
            Ok(value) => Ok(value),
            Err(OperationError::Unsuccessful(unsuccessful)) => Err(unsuccessful),
            Err(OperationError::Application(error)) => {
                Err(UnsuccessfulOperationError::failed(failure_of(codec, &error)))
            }
            Err(other) => return Err(other),
        };
        let output = ctx
            .run(self.pipeline().run(ctx, input))
            .await?
            .map_err(|e| as_outcome(codec, e))?;
        encode_output(ctx, codec, &output).await
    }
}

#[async_trait]
impl<H, O> UntypedOperationHandler for AsyncOperation<H, O>
where
    H: AsyncOperationHandler,
    O: Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        AsyncOperation::name(self)
    }

    async fn start_operation(
        &self,
        ctx: &RequestContext,
        codec: &Codec,
        request: StartOperationRequest,
    ) -> Result<StartOperationResponse, OperationError> {
        let input: H::Input = decode_input(ctx, codec, request.input).await?;
        let operation_id = ctx
            .run(self.handler().start(ctx, input, request.options))
            .await?
            .map_err(|e| as_outcome(codec, e))?;
        if operation_id.is_empty() {
            return Err(HandlerError::internal("handler returned an empty operation token").into());
        }
        Ok(StartOperationResponse::Async { operation_id })
    }

    async fn cancel_operation(
        &self,
        ctx: &RequestContext,
        codec: &Codec,
        request: CancelOperationRequest,
    ) -> Result<(), OperationError> {
        ctx.run(self.handler().cancel(ctx, &request.operation_id, request.options))
            .await?
            .map_err(|e| as_control(codec, e))
    }

    async fn get_operation_info(
        &self,
        ctx: &RequestContext,
        codec: &Codec,
        request: GetOperationInfoRequest,
    ) -> Result<OperationInfo, OperationError> {
        ctx.run(self.handler().get_info(ctx, &request.operation_id, request.options))
            .await?
            .map_err(|e| as_control(codec, e))
    }

    async fn get_operation_result(
        &self,
        ctx: &RequestContext,
        codec: &Codec,
        request: GetOperationResultRequest,
    ) -> Result<Message, OperationError> {
        let outcome = ctx
            .run(self.handler().get_result(ctx, &request.operation_id, request.options))
            .await?;
        self.finish(ctx, codec, outcome).await
    }

    /// Pure transform of a pushed completion: the handler is not called.
    async fn map_completion(
        &self,
        ctx: &RequestContext,
        codec: &Codec,
        request: MapCompletionRequest,
    ) -> Result<OperationCompletion, OperationError> {
        let outcome = match request.completion {
            OperationCompletion::Successful(message) => {
                Ok(decode_input::<H::Output>(ctx, codec, message).await?)
            }
            OperationCompletion::Unsuccessful(unsuccessful) => Err(unsuccessful.into()),
        };
        match self.finish(ctx, codec, outcome).await {
            Ok(message) => Ok(OperationCompletion::Successful(message)),
            Err(OperationError::Unsuccessful(unsuccessful)) => {
                Ok(OperationCompletion::Unsuccessful(unsuccessful))
            }
            Err(other) => Err(other),
        }
    }
}
