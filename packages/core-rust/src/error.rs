//! Error taxonomy shared by both sides of the protocol.
//!
//! Two families that are never conflated:
//!
//! - [`HandlerError`]: the request itself failed (routing, validation,
//!   missing capability, transport-level trouble).
//! - [`UnsuccessfulOperationError`]: the operation ran and ended `Failed`
//!   or `Canceled`. Always terminal.
//!
//! [`OperationError`] is what handlers return; it carries either family, the
//! `StillRunning` sentinel for result polls, or an unclassified application
//! error that the dispatch layer classifies before it leaves the server.

use std::fmt;

use http::StatusCode;

use crate::failure::Failure;
use crate::state::OperationState;

// ---------------------------------------------------------------------------
// HandlerErrorType
// ---------------------------------------------------------------------------

/// Classification of a dispatch-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum HandlerErrorType {
    /// Malformed input, including payloads no codec could decode.
    BadRequest,
    Unauthenticated,
    Unauthorized,
    /// Unknown operation name or unknown operation token.
    NotFound,
    ResourceExhausted,
    Internal,
    /// The target exists but does not implement the requested method.
    NotImplemented,
    Unavailable,
    /// The request deadline expired before the handler finished.
    UpstreamTimeout,
    /// The caller canceled the request context.
    RequestCanceled,
}

impl HandlerErrorType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::Internal => "INTERNAL",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::Unavailable => "UNAVAILABLE",
            Self::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            Self::RequestCanceled => "REQUEST_CANCELED",
        }
    }

    /// HTTP status used by the HTTP binding.
    #[must_use]
    pub fn status_code(self) -> StatusCode {
        let code = match self {
            Self::BadRequest => 400,
            Self::Unauthenticated => 401,
            Self::Unauthorized => 403,
            Self::NotFound => 404,
            Self::ResourceExhausted => 429,
            Self::RequestCanceled => 499,
            Self::Internal => 500,
            Self::NotImplemented => 501,
            Self::Unavailable => 503,
            Self::UpstreamTimeout => 521,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Inverse of [`HandlerErrorType::status_code`]. Unknown error statuses map to `None`.
    #[must_use]
    pub fn from_status_code(status: StatusCode) -> Option<Self> {
        match status.as_u16() {
            400 => Some(Self::BadRequest),
            401 => Some(Self::Unauthenticated),
            403 => Some(Self::Unauthorized),
            404 => Some(Self::NotFound),
            429 => Some(Self::ResourceExhausted),
            499 => Some(Self::RequestCanceled),
            500 => Some(Self::Internal),
            501 => Some(Self::NotImplemented),
            503 => Some(Self::Unavailable),
            521 => Some(Self::UpstreamTimeout),
            _ => None,
        }
    }
}

impl fmt::Display for HandlerErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HandlerError
// ---------------------------------------------------------------------------

/// A dispatch-level failure: the request could not be served.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {}", .failure.message)]
pub struct HandlerError {
    pub kind: HandlerErrorType,
    pub failure: Failure,
}

impl HandlerError {
    #[must_use]
    pub fn new(kind: HandlerErrorType, message: impl Into<String>) -> Self {
        Self {
            kind,
            failure: Failure::new(message),
        }
    }

    #[must_use]
    pub fn with_failure(kind: HandlerErrorType, failure: Failure) -> Self {
        Self { kind, failure }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorType::BadRequest, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorType::NotFound, message)
    }

    #[must_use]
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorType::NotImplemented, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorType::Internal, message)
    }
}

// ---------------------------------------------------------------------------
// UnsuccessfulOperationError
// ---------------------------------------------------------------------------

/// Business outcome of an operation that ended `Failed` or `Canceled`.
///
/// The state is always terminal and never `Succeeded`; constructors enforce it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("operation {state}: {}", .failure.message)]
pub struct UnsuccessfulOperationError {
    state: OperationState,
    failure: Failure,
}

impl UnsuccessfulOperationError {
    #[must_use]
    pub fn failed(failure: Failure) -> Self {
        Self {
            state: OperationState::Failed,
            failure,
        }
    }

    #[must_use]
    pub fn canceled(failure: Failure) -> Self {
        Self {
            state: OperationState::Canceled,
            failure,
        }
    }

    /// Builds the error from a state read off the wire.
    ///
    /// Returns `None` unless `state` is `Failed` or `Canceled`.
    #[must_use]
    pub fn try_new(state: OperationState, failure: Failure) -> Option<Self> {
        match state {
            OperationState::Failed | OperationState::Canceled => Some(Self { state, failure }),
            _ => None,
        }
    }

    #[must_use]
    pub fn state(&self) -> OperationState {
        self.state
    }

    #[must_use]
    pub fn failure(&self) -> &Failure {
        &self.failure
    }

    #[must_use]
    pub fn into_failure(self) -> Failure {
        self.failure
    }
}

// ---------------------------------------------------------------------------
// OperationError
// ---------------------------------------------------------------------------

/// Error returned by operation handlers and by every [`crate::Handler`] method.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error(transparent)]
    Unsuccessful(#[from] UnsuccessfulOperationError),
    /// A result was polled before the operation reached a terminal state.
    #[error("operation still running")]
    StillRunning,
    /// An application error the handler did not classify.
    #[error(transparent)]
    Application(#[from] anyhow::Error),
}

impl OperationError {
    /// Shorthand for a `NotImplemented` handler error naming the missing method.
    #[must_use]
    pub fn not_implemented(method: &str) -> Self {
        Self::Handler(HandlerError::not_implemented(format!(
            "{method} not implemented"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: [HandlerErrorType; 10] = [
        HandlerErrorType::BadRequest,
        HandlerErrorType::Unauthenticated,
        HandlerErrorType::Unauthorized,
        HandlerErrorType::NotFound,
        HandlerErrorType::ResourceExhausted,
        HandlerErrorType::Internal,
        HandlerErrorType::NotImplemented,
        HandlerErrorType::Unavailable,
        HandlerErrorType::UpstreamTimeout,
        HandlerErrorType::RequestCanceled,
    ];

    #[test]
    fn status_codes_map_back_to_types() {
        for kind in ALL_TYPES {
            assert_eq!(HandlerErrorType::from_status_code(kind.status_code()), Some(kind));
        }
        assert_eq!(HandlerErrorType::from_status_code(StatusCode::IM_A_TEAPOT), None);
    }

    #[test]
    fn unsuccessful_rejects_non_failure_states() {
        for state in [
            OperationState::Pending,
            OperationState::Running,
            OperationState::Succeeded,
        ] {
            assert!(UnsuccessfulOperationError::try_new(state, Failure::new("x")).is_none());
        }
        let err =
            UnsuccessfulOperationError::try_new(OperationState::Canceled, Failure::new("x"))
                .unwrap();
        assert_eq!(err.state(), OperationState::Canceled);
    }

    #[test]
    fn display_includes_classification() {
        let err = HandlerError::not_found("no such operation");
        assert_eq!(err.to_string(), "NOT_FOUND: no such operation");
        let err = UnsuccessfulOperationError::failed(Failure::new("intentional"));
        assert_eq!(err.to_string(), "operation failed: intentional");
    }

    #[test]
    fn operation_error_conversions_keep_family() {
        let err: OperationError = HandlerError::bad_request("bad").into();
        assert!(matches!(
            err,
            OperationError::Handler(ref h) if h.kind == HandlerErrorType::BadRequest
        ));
        let err: OperationError = UnsuccessfulOperationError::canceled(Failure::new("c")).into();
        assert!(matches!(
            err,
            OperationError::Unsuccessful(ref u) if u.state() == OperationState::Canceled
        ));
        let err: OperationError = anyhow::anyhow!("app").into();
        assert!(matches!(err, OperationError::Application(_)));
    }
}
