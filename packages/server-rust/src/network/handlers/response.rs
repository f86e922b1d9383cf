//! Response building for the HTTP binding.

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use nexus_core::{
    Failure, HandlerErrorType, Message, OperationError, OperationState,
    UnsuccessfulOperationError, HEADER_OPERATION_STATE,
};
use tracing::warn;

/// Status of an unsuccessful outcome: the operation ran and failed or was canceled.
pub const STATUS_OPERATION_FAILED: StatusCode = StatusCode::FAILED_DEPENDENCY;

/// Status of a result poll for an operation that is not yet terminal.
pub const STATUS_STILL_RUNNING: StatusCode = StatusCode::PRECONDITION_FAILED;

/// An [`OperationError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub OperationError);

impl From<OperationError> for ApiError {
    fn from(err: OperationError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            OperationError::Handler(err) => json_response(err.kind.status_code(), &err.failure),
            OperationError::Unsuccessful(err) => unsuccessful_response(err),
            OperationError::StillRunning => json_response(
                STATUS_STILL_RUNNING,
                &Failure::new("operation still running"),
            ),
            OperationError::Application(err) => {
                // The router classifies application errors; reaching here means
                // a custom Handler returned one unclassified.
                warn!(error = %format!("{err:#}"), "unclassified application error");
                json_response(
                    HandlerErrorType::Internal.status_code(),
                    &Failure::new(format!("{err:#}")),
                )
            }
        }
    }
}

/// `424` with the terminal state header and the failure as JSON.
pub fn unsuccessful_response(err: UnsuccessfulOperationError) -> Response {
    let state = err.state();
    let mut response = json_response(STATUS_OPERATION_FAILED, err.failure());
    response
        .headers_mut()
        .insert(HEADER_OPERATION_STATE, state_header(state));
    response
}

/// Writes a message's headers and body verbatim.
///
/// Built by hand rather than through `IntoResponse for Bytes`, which would
/// add a content type to messages that carry none.
pub fn message_response(status: StatusCode, message: Message) -> Response {
    let (headers, body) = message.into_parts();
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().extend(headers);
    response
}

pub fn json_response<T: serde::Serialize>(status: StatusCode, value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => {
            let mut response = Response::new(Body::from(body));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(err) => {
            warn!(error = %err, "failed to serialize response body");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn state_header(state: OperationState) -> HeaderValue {
    HeaderValue::from_static(state.as_str())
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use nexus_core::HandlerError;

    use super::*;

    async fn body_of(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn handler_error_uses_mapped_status_and_failure_body() {
        let response = ApiError(HandlerError::not_found("operation \"x\" not found").into())
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let failure: Failure = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(failure.message, "operation \"x\" not found");
    }

    #[tokio::test]
    async fn unsuccessful_carries_state_header() {
        let err = UnsuccessfulOperationError::canceled(Failure::new("stopped"));
        let response = ApiError(err.into()).into_response();
        assert_eq!(response.status(), STATUS_OPERATION_FAILED);
        assert_eq!(response.headers()[HEADER_OPERATION_STATE], "canceled");
        let failure: Failure = serde_json::from_slice(&body_of(response).await).unwrap();
        assert_eq!(failure.message, "stopped");
    }

    #[test]
    fn still_running_is_precondition_failed() {
        let response = ApiError(OperationError::StillRunning).into_response();
        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
    }

    #[tokio::test]
    async fn empty_message_has_no_content_type() {
        let response = message_response(StatusCode::OK, Message::empty());
        assert!(response.headers().get(CONTENT_TYPE).is_none());
        assert!(body_of(response).await.is_empty());
    }
}
