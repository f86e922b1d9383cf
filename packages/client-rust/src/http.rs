//! HTTP transport: a [`Handler`] that forwards every call to a remote server.
//!
//! Operation names and IDs are appended as single percent-encoded path
//! segments, so values containing `/`, spaces or `%` round-trip unchanged.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{HeaderMap, HeaderValue, StatusCode};
use nexus_core::{
    CancelOperationRequest, Failure, GetOperationInfoRequest, GetOperationResultRequest,
    Handler, HandlerError, HandlerErrorType, MapCompletionRequest, Message,
    OperationCompletion, OperationError, OperationInfo, OperationState, RequestContext,
    StartOperationRequest, StartOperationResponse, UnsuccessfulOperationError,
    HEADER_OPERATION_STATE, HEADER_REQUEST_ID,
};
use reqwest::{Client, RequestBuilder, Url};
use tracing::debug;

use crate::error::ClientError;

/// Sent on every request.
pub const USER_AGENT: &str = concat!("nexus-client-rust/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL of the server; operation routes are appended to its path.
    pub base_url: String,
    /// Timeout for one HTTP exchange. Result polls add their `wait` on top.
    pub request_timeout: Duration,
}

impl HttpTransportConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// [`Handler`] over HTTP, backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpTransport {
    /// # Errors
    ///
    /// `Transport` if the base URL is invalid or cannot carry a path, or if
    /// the HTTP client cannot be built.
    pub fn new(config: HttpTransportConfig) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ClientError::Transport(anyhow::anyhow!("invalid base URL {:?}: {e}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Transport(anyhow::anyhow!(
                "base URL {:?} cannot carry a path",
                config.base_url
            )));
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.into()))?;

        Ok(Self {
            client,
            base_url,
            request_timeout: config.request_timeout,
        })
    }

    /// The base URL with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url, OperationError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| HandlerError::internal("base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        ctx: &RequestContext,
        request: RequestBuilder,
    ) -> Result<(StatusCode, HeaderMap, Bytes), OperationError> {
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, headers, body))
        };
        ctx.run(exchange).await?.map_err(transport_error)
    }
}

#[async_trait]
impl Handler for HttpTransport {
    async fn start_operation(
        &self,
        ctx: &RequestContext,
        request: StartOperationRequest,
    ) -> Result<StartOperationResponse, OperationError> {
        let mut url = self.url(&[request.operation.as_str()])?;
        if let Some(callback) = request.options.callback_url.as_deref() {
            url.query_pairs_mut().append_pair("callback", callback);
        }
        let (message_headers, body) = request.input.into_parts();
        let mut headers = request.options.header;
        headers.extend(message_headers);
        if let Some(request_id) = request.options.request_id.as_deref() {
            let value = HeaderValue::from_str(request_id).map_err(|_| {
                HandlerError::bad_request(format!("invalid request ID: {request_id:?}"))
            })?;
            headers.insert(HEADER_REQUEST_ID, value);
        }
        debug!(operation = %request.operation, %url, "POST start");

        let builder = self.client.post(url).headers(headers).body(body);
        let (status, headers, body) = self.send(ctx, builder).await?;
        match status {
            StatusCode::OK => Ok(StartOperationResponse::Sync(message_from(&headers, body))),
            StatusCode::CREATED => {
                let info: OperationInfo = serde_json::from_slice(&body).map_err(|e| {
                    unexpected(format!("invalid operation info: {e}"))
                })?;
                Ok(StartOperationResponse::Async {
                    operation_id: info.id,
                })
            }
            _ => Err(error_from(status, &headers, &body)),
        }
    }

    async fn cancel_operation(
        &self,
        ctx: &RequestContext,
        request: CancelOperationRequest,
    ) -> Result<(), OperationError> {
        let url = self.url(&[request.operation.as_str(), request.operation_id.as_str(), "cancel"])?;
        let builder = self.client.post(url).headers(request.options.header);
        let (status, headers, body) = self.send(ctx, builder).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(error_from(status, &headers, &body))
        }
    }

    async fn get_operation_info(
        &self,
        ctx: &RequestContext,
        request: GetOperationInfoRequest,
    ) -> Result<OperationInfo, OperationError> {
        let url = self.url(&[request.operation.as_str(), request.operation_id.as_str()])?;
        let builder = self.client.get(url).headers(request.options.header);
        let (status, headers, body) = self.send(ctx, builder).await?;
        if status != StatusCode::OK {
            return Err(error_from(status, &headers, &body));
        }
        serde_json::from_slice(&body)
            .map_err(|e| unexpected(format!("invalid operation info: {e}")))
    }

    async fn get_operation_result(
        &self,
        ctx: &RequestContext,
        request: GetOperationResultRequest,
    ) -> Result<Message, OperationError> {
        let mut url = self.url(&[
            request.operation.as_str(),
            request.operation_id.as_str(),
            "result",
        ])?;
        let mut timeout = self.request_timeout;
        if let Some(wait) = request.options.wait {
            url.query_pairs_mut()
                .append_pair("wait", &format!("{}ms", wait.as_millis()));
            timeout += wait;
        }
        let builder = self
            .client
            .get(url)
            .headers(request.options.header)
            .timeout(timeout);
        let (status, headers, body) = self.send(ctx, builder).await?;
        if status != StatusCode::OK {
            return Err(error_from(status, &headers, &body));
        }
        Ok(message_from(&headers, body))
    }

    async fn map_completion(
        &self,
        ctx: &RequestContext,
        request: MapCompletionRequest,
    ) -> Result<OperationCompletion, OperationError> {
        let url = self.url(&[request.operation.as_str(), "completion"])?;
        let builder = match request.completion {
            OperationCompletion::Successful(message) => {
                let (headers, body) = message.into_parts();
                self.client.post(url).headers(headers).body(body)
            }
            OperationCompletion::Unsuccessful(err) => {
                let body = serde_json::to_vec(err.failure())
                    .map_err(|e| HandlerError::internal(format!("failed to encode failure: {e}")))?;
                self.client
                    .post(url)
                    .header(HEADER_OPERATION_STATE, err.state().as_str())
                    .header(http::header::CONTENT_TYPE, "application/json")
                    .body(body)
            }
        };
        let (status, headers, body) = self.send(ctx, builder).await?;
        if status == StatusCode::OK {
            return Ok(OperationCompletion::Successful(message_from(&headers, body)));
        }
        match error_from(status, &headers, &body) {
            OperationError::Unsuccessful(err) => Ok(OperationCompletion::Unsuccessful(err)),
            other => Err(other),
        }
    }
}

/// Keeps the `content-*` headers (except `content-length`) as the message headers.
fn message_from(headers: &HeaderMap, body: Bytes) -> Message {
    let mut message_headers = HeaderMap::new();
    for (name, value) in headers {
        if name != CONTENT_LENGTH && name.as_str().starts_with("content-") {
            message_headers.append(name.clone(), value.clone());
        }
    }
    Message::new(message_headers, body)
}

/// Maps a non-success response back into the protocol's error families.
fn error_from(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> OperationError {
    let failure = serde_json::from_slice::<Failure>(body).unwrap_or_else(|_| {
        Failure::new(
            status
                .canonical_reason()
                .map_or_else(|| status.to_string(), str::to_string),
        )
    });
    match status {
        StatusCode::FAILED_DEPENDENCY => {
            let state = headers
                .get(HEADER_OPERATION_STATE)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<OperationState>().ok());
            match state.and_then(|state| UnsuccessfulOperationError::try_new(state, failure)) {
                Some(err) => err.into(),
                None => unexpected("424 response without a terminal operation state"),
            }
        }
        StatusCode::PRECONDITION_FAILED => OperationError::StillRunning,
        _ => match HandlerErrorType::from_status_code(status) {
            Some(kind) => HandlerError::with_failure(kind, failure).into(),
            None => unexpected(format!("unexpected response status {status}")),
        },
    }
}

fn unexpected(message: impl Into<String>) -> OperationError {
    OperationError::Application(anyhow::anyhow!(message.into()))
}

fn transport_error(err: reqwest::Error) -> OperationError {
    if err.is_timeout() {
        HandlerError::new(HandlerErrorType::UpstreamTimeout, err.to_string()).into()
    } else {
        OperationError::Application(anyhow::Error::new(err).context("HTTP request failed"))
    }
}
