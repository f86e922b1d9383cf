//! The protocol surface a server exposes: five methods keyed by operation name.

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::OperationError;
use crate::message::Message;
use crate::request::{
    CancelOperationRequest, GetOperationInfoRequest, GetOperationResultRequest,
    MapCompletionRequest, OperationCompletion, StartOperationRequest, StartOperationResponse,
};
use crate::state::OperationInfo;

/// Untyped handler for all protocol methods.
///
/// Every method defaults to a `NotImplemented` handler error, so implementors
/// only override what they support. Transports (the HTTP binding, the
/// in-process dispatch pipeline) call into this trait.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn start_operation(
        &self,
        ctx: &RequestContext,
        request: StartOperationRequest,
    ) -> Result<StartOperationResponse, OperationError> {
        let _ = (ctx, request);
        Err(OperationError::not_implemented("start_operation"))
    }

    async fn cancel_operation(
        &self,
        ctx: &RequestContext,
        request: CancelOperationRequest,
    ) -> Result<(), OperationError> {
        let _ = (ctx, request);
        Err(OperationError::not_implemented("cancel_operation"))
    }

    async fn get_operation_info(
        &self,
        ctx: &RequestContext,
        request: GetOperationInfoRequest,
    ) -> Result<OperationInfo, OperationError> {
        let _ = (ctx, request);
        Err(OperationError::not_implemented("get_operation_info"))
    }

    /// Returns the successful output, `Unsuccessful` for a failed or canceled
    /// operation, or `StillRunning` if no terminal state was reached in time.
    async fn get_operation_result(
        &self,
        ctx: &RequestContext,
        request: GetOperationResultRequest,
    ) -> Result<Message, OperationError> {
        let _ = (ctx, request);
        Err(OperationError::not_implemented("get_operation_result"))
    }

    /// Maps a pushed completion into the operation's declared output shape.
    async fn map_completion(
        &self,
        ctx: &RequestContext,
        request: MapCompletionRequest,
    ) -> Result<OperationCompletion, OperationError> {
        let _ = (ctx, request);
        Err(OperationError::not_implemented("map_completion"))
    }
}
