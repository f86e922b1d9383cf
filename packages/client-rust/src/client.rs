//! The caller-side entry point.

use std::sync::Arc;

use http::HeaderMap;
use http::HeaderValue;
use nexus_core::codec::Payload;
use nexus_core::{
    Codec, Handler, Message, RequestContext, StartOperationOptions, StartOperationRequest,
    StartOperationResponse, HEADER_REQUEST_ID,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;
use crate::handle::OperationHandle;

#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Codec used for inputs and results.
    pub codec: Codec,
}

/// Starts operations on a [`Handler`] and creates handles to them.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Handler>,
    codec: Codec,
}

/// Outcome of [`Client::start_operation`].
#[derive(Debug)]
pub enum StartOperationResult {
    /// The operation completed within the start call.
    Successful(OperationResult),
    /// The operation continues asynchronously.
    Pending(OperationHandle),
}

/// A successful result message, decoded on demand.
#[derive(Debug)]
pub struct OperationResult {
    message: Message,
    codec: Codec,
}

impl OperationResult {
    pub(crate) fn new(message: Message, codec: Codec) -> Self {
        Self { message, codec }
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.message.headers()
    }

    /// Decodes the result. Consumes the body.
    ///
    /// # Errors
    ///
    /// Returns `Codec` if no codec in the chain can decode the message into `T`.
    pub fn read<T>(self) -> Result<T, ClientError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        Ok(self.codec.decode(self.message)?)
    }
}

impl Client {
    #[must_use]
    pub fn new(transport: Arc<dyn Handler>, options: ClientOptions) -> Self {
        Self {
            transport,
            codec: options.codec,
        }
    }

    /// Encodes `input` and starts `operation`.
    ///
    /// The request ID is the explicit `options.request_id`, else the
    /// `Nexus-Request-Id` value in `options.header`, else a fresh UUID v4.
    ///
    /// # Errors
    ///
    /// `Codec` if the input cannot be encoded, `Unsuccessful` if the
    /// operation failed synchronously, otherwise the handler error.
    pub async fn start_operation<I>(
        &self,
        ctx: &RequestContext,
        operation: &str,
        input: &I,
        mut options: StartOperationOptions,
    ) -> Result<StartOperationResult, ClientError>
    where
        I: Payload,
    {
        let input = self.codec.encode(input)?;
        let request_id = resolve_request_id(&options);
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            options.header.insert(HEADER_REQUEST_ID, value);
        }
        options.request_id = Some(request_id);
        debug!(operation, request_id = ?options.request_id, "start operation");

        let response = self
            .transport
            .start_operation(
                ctx,
                StartOperationRequest {
                    operation: operation.to_string(),
                    input,
                    options,
                },
            )
            .await?;

        match response {
            StartOperationResponse::Sync(message) => Ok(StartOperationResult::Successful(
                OperationResult::new(message, self.codec.clone()),
            )),
            StartOperationResponse::Async { operation_id } if operation_id.is_empty() => {
                Err(ClientError::UnexpectedResponse(
                    "async start returned an empty operation ID".into(),
                ))
            }
            StartOperationResponse::Async { operation_id } => {
                Ok(StartOperationResult::Pending(OperationHandle::new(
                    operation.to_string(),
                    operation_id,
                    Arc::clone(&self.transport),
                    self.codec.clone(),
                )))
            }
        }
    }

    /// Rebuilds a handle from a persisted operation name and ID.
    ///
    /// # Errors
    ///
    /// `InvalidHandle` if either identifier is empty.
    pub fn new_handle(
        &self,
        operation: impl Into<String>,
        id: impl Into<String>,
    ) -> Result<OperationHandle, ClientError> {
        let operation = operation.into();
        let id = id.into();
        if operation.is_empty() {
            return Err(ClientError::InvalidHandle("empty operation name".into()));
        }
        if id.is_empty() {
            return Err(ClientError::InvalidHandle("empty operation ID".into()));
        }
        Ok(OperationHandle::new(
            operation,
            id,
            Arc::clone(&self.transport),
            self.codec.clone(),
        ))
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

fn resolve_request_id(options: &StartOperationOptions) -> String {
    options
        .request_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| {
            options
                .header
                .get(HEADER_REQUEST_ID)
                .and_then(|v| v.to_str().ok())
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
