//! Route handlers: translate HTTP requests into [`HandlerRequest`]s and
//! dispatch them through the shared pipeline.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use nexus_core::{
    CancelOperationOptions, CancelOperationRequest, Failure, GetOperationInfoOptions,
    GetOperationInfoRequest, GetOperationResultOptions, GetOperationResultRequest,
    HandlerError, MapCompletionRequest, Message, OperationCompletion, OperationError,
    OperationInfo, OperationState, RequestContext, StartOperationOptions,
    StartOperationRequest, StartOperationResponse, UnsuccessfulOperationError,
    HEADER_OPERATION_STATE, HEADER_REQUEST_ID,
};
use serde::Deserialize;
use tower::ServiceExt;

use super::response::{json_response, message_response, unsuccessful_response, ApiError};
use super::AppState;
use crate::service::{HandlerRequest, HandlerResponse};

#[derive(Debug, Default, Deserialize)]
pub struct StartQuery {
    pub callback: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResultQuery {
    pub wait: Option<String>,
}

/// `POST /{operation}`
pub async fn start_operation_handler(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    Query(query): Query<StartQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let (message_headers, header) = split_headers(headers);
    let request_id = header
        .get(HEADER_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let request = StartOperationRequest {
        operation,
        input: Message::new(message_headers, body),
        options: StartOperationOptions {
            header,
            callback_url: query.callback.filter(|c| !c.is_empty()),
            request_id,
        },
    };

    let request = HandlerRequest::Start {
        ctx: RequestContext::new(),
        request,
    };
    match dispatch(&state, request).await? {
        HandlerResponse::Started(StartOperationResponse::Sync(message)) => {
            Ok(message_response(StatusCode::OK, message))
        }
        HandlerResponse::Started(StartOperationResponse::Async { operation_id }) => {
            let info = OperationInfo::new(operation_id, OperationState::Running);
            Ok(json_response(StatusCode::CREATED, &info))
        }
        other => Err(unexpected(&other)),
    }
}

/// `POST /{operation}/{operation_id}/cancel`
pub async fn cancel_operation_handler(
    State(state): State<AppState>,
    Path((operation, operation_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let request = CancelOperationRequest {
        operation,
        operation_id,
        options: CancelOperationOptions { header: headers },
    };
    let request = HandlerRequest::Cancel {
        ctx: RequestContext::new(),
        request,
    };
    match dispatch(&state, request).await? {
        HandlerResponse::Canceled => Ok(StatusCode::ACCEPTED.into_response()),
        other => Err(unexpected(&other)),
    }
}

/// `GET /{operation}/{operation_id}`
pub async fn get_operation_info_handler(
    State(state): State<AppState>,
    Path((operation, operation_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let request = GetOperationInfoRequest {
        operation,
        operation_id,
        options: GetOperationInfoOptions { header: headers },
    };
    let request = HandlerRequest::GetInfo {
        ctx: RequestContext::new(),
        request,
    };
    match dispatch(&state, request).await? {
        HandlerResponse::Info(info) => Ok(json_response(StatusCode::OK, &info)),
        other => Err(unexpected(&other)),
    }
}

/// `GET /{operation}/{operation_id}/result?wait=`
pub async fn get_operation_result_handler(
    State(state): State<AppState>,
    Path((operation, operation_id)): Path<(String, String)>,
    Query(query): Query<ResultQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let wait = query
        .wait
        .as_deref()
        .map(parse_wait)
        .transpose()
        .map_err(OperationError::from)?;
    let request = GetOperationResultRequest {
        operation,
        operation_id,
        options: GetOperationResultOptions {
            header: headers,
            wait,
        },
    };
    let request = HandlerRequest::GetResult {
        ctx: RequestContext::new(),
        request,
    };
    match dispatch(&state, request).await? {
        HandlerResponse::Result(message) => Ok(message_response(StatusCode::OK, message)),
        other => Err(unexpected(&other)),
    }
}

/// Last path segment of the completion route.
pub const COMPLETION_SEGMENT: &str = "completion";

/// `POST /{operation}/completion`
///
/// Registered on `/{operation}/{operation_id}`; any other second segment is
/// `NOT_FOUND`. A completion without `Nexus-Operation-State`, or with
/// `succeeded`, carries the result message; `failed` and `canceled` carry a
/// JSON [`Failure`].
pub async fn map_completion_handler(
    State(state): State<AppState>,
    Path((operation, segment)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    if segment != COMPLETION_SEGMENT {
        return Err(ApiError(
            HandlerError::not_found(format!("no POST route for operation ID {segment:?}")).into(),
        ));
    }
    let (message_headers, header) = split_headers(headers);
    let completion = completion_from_parts(&header, message_headers, body)?;
    let request = MapCompletionRequest {
        operation,
        completion,
    };
    let request = HandlerRequest::MapCompletion {
        ctx: RequestContext::new(),
        request,
    };
    match dispatch(&state, request).await? {
        HandlerResponse::Completion(OperationCompletion::Successful(message)) => {
            Ok(message_response(StatusCode::OK, message))
        }
        HandlerResponse::Completion(OperationCompletion::Unsuccessful(err)) => {
            Ok(unsuccessful_response(err))
        }
        other => Err(unexpected(&other)),
    }
}

async fn dispatch(state: &AppState, request: HandlerRequest) -> Result<HandlerResponse, ApiError> {
    Ok(state.pipeline.clone().oneshot(request).await?)
}

fn unexpected(response: &HandlerResponse) -> ApiError {
    let message = format!("unexpected dispatch response: {response:?}");
    ApiError(HandlerError::internal(message).into())
}

/// Splits request headers into message headers (`content-*` except
/// `content-length`) and everything else.
pub fn split_headers(headers: HeaderMap) -> (HeaderMap, HeaderMap) {
    let mut message = HeaderMap::new();
    let mut options = HeaderMap::new();
    let mut current = None;
    for (name, value) in headers {
        // Repeated values of a header arrive with `name == None`.
        if let Some(name) = name {
            current = Some(name);
        }
        let Some(name) = current.clone() else {
            continue;
        };
        let target = if name != CONTENT_LENGTH && name.as_str().starts_with("content-") {
            &mut message
        } else {
            &mut options
        };
        target.append(name, value);
    }
    (message, options)
}

fn completion_from_parts(
    header: &HeaderMap,
    message_headers: HeaderMap,
    body: Bytes,
) -> Result<OperationCompletion, OperationError> {
    let state = match header.get(HEADER_OPERATION_STATE) {
        None => OperationState::Succeeded,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| HandlerError::bad_request("invalid operation state header"))?,
    };
    if state == OperationState::Succeeded {
        return Ok(OperationCompletion::Successful(Message::new(
            message_headers,
            body,
        )));
    }
    let failure: Failure = serde_json::from_slice(&body)
        .map_err(|e| HandlerError::bad_request(format!("invalid failure: {e}")))?;
    UnsuccessfulOperationError::try_new(state, failure)
        .map(OperationCompletion::Unsuccessful)
        .ok_or_else(|| {
            HandlerError::bad_request(format!("completion state must be terminal, got {state}"))
                .into()
        })
}

/// Parses `250ms`, `2s`, or a bare number of milliseconds.
pub fn parse_wait(raw: &str) -> Result<Duration, HandlerError> {
    let raw = raw.trim();
    let (digits, unit_ms) = if let Some(ms) = raw.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(s) = raw.strip_suffix('s') {
        (s, 1000)
    } else {
        (raw, 1)
    };
    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(unit_ms))
        .map(Duration::from_millis)
        .ok_or_else(|| HandlerError::bad_request(format!("invalid wait duration: {raw:?}")))
}
