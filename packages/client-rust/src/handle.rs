//! Handles to asynchronous operations.

use std::fmt;
use std::sync::Arc;

use nexus_core::{
    CancelOperationOptions, CancelOperationRequest, Codec, GetOperationInfoOptions,
    GetOperationInfoRequest, GetOperationResultOptions, GetOperationResultRequest, Handler,
    OperationInfo, RequestContext,
};
use tracing::debug;

use crate::client::OperationResult;
use crate::error::ClientError;

/// Refers to one asynchronous operation by name and ID.
///
/// Returned by [`crate::Client::start_operation`] or rebuilt from persisted
/// identifiers with [`crate::Client::new_handle`]; both behave the same.
#[derive(Clone)]
pub struct OperationHandle {
    operation: String,
    id: String,
    transport: Arc<dyn Handler>,
    codec: Codec,
}

impl OperationHandle {
    pub(crate) fn new(
        operation: String,
        id: String,
        transport: Arc<dyn Handler>,
        codec: Codec,
    ) -> Self {
        Self {
            operation,
            id,
            transport,
            codec,
        }
    }

    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Requests cancellation. Success means the request was delivered, not
    /// that the operation stopped.
    ///
    /// # Errors
    ///
    /// Returns the handler error reported by the server or transport.
    pub async fn cancel(
        &self,
        ctx: &RequestContext,
        options: CancelOperationOptions,
    ) -> Result<(), ClientError> {
        debug!(operation = %self.operation, id = %self.id, "cancel operation");
        self.transport
            .cancel_operation(
                ctx,
                CancelOperationRequest {
                    operation: self.operation.clone(),
                    operation_id: self.id.clone(),
                    options,
                },
            )
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the handler error reported by the server or transport.
    pub async fn get_info(
        &self,
        ctx: &RequestContext,
        options: GetOperationInfoOptions,
    ) -> Result<OperationInfo, ClientError> {
        let info = self
            .transport
            .get_operation_info(
                ctx,
                GetOperationInfoRequest {
                    operation: self.operation.clone(),
                    operation_id: self.id.clone(),
                    options,
                },
            )
            .await?;
        Ok(info)
    }

    /// Fetches the result, waiting up to `options.wait` for it to become available.
    ///
    /// # Errors
    ///
    /// `StillRunning` if the operation is not yet terminal, `Unsuccessful`
    /// if it failed or was canceled, otherwise the handler error.
    pub async fn get_result(
        &self,
        ctx: &RequestContext,
        options: GetOperationResultOptions,
    ) -> Result<OperationResult, ClientError> {
        let message = self
            .transport
            .get_operation_result(
                ctx,
                GetOperationResultRequest {
                    operation: self.operation.clone(),
                    operation_id: self.id.clone(),
                    options,
                },
            )
            .await?;
        Ok(OperationResult::new(message, self.codec.clone()))
    }
}

impl fmt::Debug for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHandle")
            .field("operation", &self.operation)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
