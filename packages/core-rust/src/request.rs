//! Request and response shapes of the five protocol methods.
//!
//! Operation names and tokens are opaque strings; any escaping needed to put
//! them on the wire is the transport's concern and must round-trip exactly.

use std::time::Duration;

use http::HeaderMap;

use crate::error::UnsuccessfulOperationError;
use crate::message::Message;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Options of a start call.
#[derive(Debug, Clone, Default)]
pub struct StartOperationOptions {
    /// Caller-supplied headers, minus the content headers of the input.
    pub header: HeaderMap,
    /// Where the handler's substrate should push the completion, if anywhere.
    pub callback_url: Option<String>,
    /// Correlator for idempotent retry detection.
    ///
    /// On the client an explicit value beats the `Nexus-Request-Id` header,
    /// which beats a freshly generated ID. Handlers always see the resolved value.
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CancelOperationOptions {
    pub header: HeaderMap,
}

#[derive(Debug, Clone, Default)]
pub struct GetOperationInfoOptions {
    pub header: HeaderMap,
}

#[derive(Debug, Clone, Default)]
pub struct GetOperationResultOptions {
    pub header: HeaderMap,
    /// How long the handler may wait for a terminal state before answering
    /// "still running". `None` means answer immediately.
    pub wait: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct StartOperationRequest {
    pub operation: String,
    pub input: Message,
    pub options: StartOperationOptions,
}

#[derive(Debug, Clone)]
pub struct CancelOperationRequest {
    pub operation: String,
    pub operation_id: String,
    pub options: CancelOperationOptions,
}

#[derive(Debug, Clone)]
pub struct GetOperationInfoRequest {
    pub operation: String,
    pub operation_id: String,
    pub options: GetOperationInfoOptions,
}

#[derive(Debug, Clone)]
pub struct GetOperationResultRequest {
    pub operation: String,
    pub operation_id: String,
    pub options: GetOperationResultOptions,
}

/// A completion pushed by the execution substrate, to be mapped into the
/// operation's declared output shape.
#[derive(Debug)]
pub struct MapCompletionRequest {
    pub operation: String,
    pub completion: OperationCompletion,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Outcome of a start call.
#[derive(Debug)]
pub enum StartOperationResponse {
    /// Completed within the call.
    Sync(Message),
    /// Accepted; the outcome is obtained later through the token.
    Async { operation_id: String },
}

/// Terminal outcome of an operation, with an explicit discriminator.
#[derive(Debug)]
pub enum OperationCompletion {
    Successful(Message),
    Unsuccessful(UnsuccessfulOperationError),
}
