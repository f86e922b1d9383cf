//! Client-side error type.

use nexus_core::{CodecError, HandlerError, OperationError, UnsuccessfulOperationError};

/// Errors returned by [`crate::Client`] and [`crate::OperationHandle`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server could not serve the request.
    #[error(transparent)]
    Handler(HandlerError),
    /// The operation ran and ended `Failed` or `Canceled`.
    #[error(transparent)]
    Unsuccessful(UnsuccessfulOperationError),
    /// A result was requested before the operation finished.
    #[error("operation still running")]
    StillRunning,
    #[error("codec: {0}")]
    Codec(#[from] CodecError),
    /// The request never produced a protocol response.
    #[error("transport: {0:#}")]
    Transport(anyhow::Error),
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("invalid handle: {0}")]
    InvalidHandle(String),
}

impl From<OperationError> for ClientError {
    fn from(err: OperationError) -> Self {
        match err {
            OperationError::Handler(err) => Self::Handler(err),
            OperationError::Unsuccessful(err) => Self::Unsuccessful(err),
            OperationError::StillRunning => Self::StillRunning,
            OperationError::Application(err) => Self::Transport(err),
        }
    }
}
