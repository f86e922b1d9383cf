//! Tower adapter over the [`Handler`] protocol surface.
//!
//! Each protocol call becomes one [`HandlerRequest`] carrying its own
//! [`RequestContext`], so middleware can tighten the deadline or cancel the
//! call without knowing which method it wraps.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use nexus_core::{
    CancelOperationRequest, GetOperationInfoRequest, GetOperationResultRequest, Handler,
    MapCompletionRequest, Message, OperationCompletion, OperationError, OperationInfo,
    RequestContext, StartOperationRequest, StartOperationResponse,
};
use tower::Service;

/// Boxed future returned by every service in the dispatch pipeline.
pub type DispatchFuture =
    Pin<Box<dyn Future<Output = Result<HandlerResponse, OperationError>> + Send>>;

/// One protocol call.
#[derive(Debug)]
pub enum HandlerRequest {
    Start {
        ctx: RequestContext,
        request: StartOperationRequest,
    },
    Cancel {
        ctx: RequestContext,
        request: CancelOperationRequest,
    },
    GetInfo {
        ctx: RequestContext,
        request: GetOperationInfoRequest,
    },
    GetResult {
        ctx: RequestContext,
        request: GetOperationResultRequest,
    },
    MapCompletion {
        ctx: RequestContext,
        request: MapCompletionRequest,
    },
}

impl HandlerRequest {
    #[must_use]
    pub fn ctx(&self) -> &RequestContext {
        match self {
            Self::Start { ctx, .. }
            | Self::Cancel { ctx, .. }
            | Self::GetInfo { ctx, .. }
            | Self::GetResult { ctx, .. }
            | Self::MapCompletion { ctx, .. } => ctx,
        }
    }

    pub fn ctx_mut(&mut self) -> &mut RequestContext {
        match self {
            Self::Start { ctx, .. }
            | Self::Cancel { ctx, .. }
            | Self::GetInfo { ctx, .. }
            | Self::GetResult { ctx, .. }
            | Self::MapCompletion { ctx, .. } => ctx,
        }
    }

    /// Name of the target operation.
    #[must_use]
    pub fn operation(&self) -> &str {
        match self {
            Self::Start { request, .. } => &request.operation,
            Self::Cancel { request, .. } => &request.operation,
            Self::GetInfo { request, .. } => &request.operation,
            Self::GetResult { request, .. } => &request.operation,
            Self::MapCompletion { request, .. } => &request.operation,
        }
    }

    #[must_use]
    pub fn method(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start_operation",
            Self::Cancel { .. } => "cancel_operation",
            Self::GetInfo { .. } => "get_operation_info",
            Self::GetResult { .. } => "get_operation_result",
            Self::MapCompletion { .. } => "map_completion",
        }
    }
}

/// Successful result of a [`HandlerRequest`], one variant per method.
#[derive(Debug)]
pub enum HandlerResponse {
    Started(StartOperationResponse),
    Canceled,
    Info(OperationInfo),
    Result(Message),
    Completion(OperationCompletion),
}

// ---------------------------------------------------------------------------
// HandlerService
// ---------------------------------------------------------------------------

/// Innermost service of the pipeline: forwards each request to a [`Handler`].
pub struct HandlerService<H: ?Sized> {
    handler: Arc<H>,
}

impl<H: ?Sized> HandlerService<H> {
    #[must_use]
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }
}

impl<H: ?Sized> Clone for HandlerService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<H> Service<HandlerRequest> for HandlerService<H>
where
    H: Handler + ?Sized + 'static,
{
    type Response = HandlerResponse;
    type Error = OperationError;
    type Future = DispatchFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: HandlerRequest) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        Box::pin(async move {
            match req {
                HandlerRequest::Start { ctx, request } => handler
                    .start_operation(&ctx, request)
                    .await
                    .map(HandlerResponse::Started),
                HandlerRequest::Cancel { ctx, request } => handler
                    .cancel_operation(&ctx, request)
                    .await
                    .map(|()| HandlerResponse::Canceled),
                HandlerRequest::GetInfo { ctx, request } => handler
                    .get_operation_info(&ctx, request)
                    .await
                    .map(HandlerResponse::Info),
                HandlerRequest::GetResult { ctx, request } => handler
                    .get_operation_result(&ctx, request)
                    .await
                    .map(HandlerResponse::Result),
                HandlerRequest::MapCompletion { ctx, request } => handler
                    .map_completion(&ctx, request)
                    .await
                    .map(HandlerResponse::Completion),
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use nexus_core::{CancelOperationOptions, HandlerErrorType, OperationState};
    use tower::ServiceExt;

    use super::*;

    /// Answers cancel and get-info; everything else uses the trait defaults.
    pub(crate) struct InfoOnly;

    #[async_trait]
    impl Handler for InfoOnly {
        async fn cancel_operation(
            &self,
            _ctx: &RequestContext,
            _request: CancelOperationRequest,
        ) -> Result<(), OperationError> {
            Ok(())
        }

        async fn get_operation_info(
            &self,
            _ctx: &RequestContext,
            request: GetOperationInfoRequest,
        ) -> Result<OperationInfo, OperationError> {
            Ok(OperationInfo::new(request.operation_id, OperationState::Running))
        }
    }

    pub(crate) fn cancel_request(operation: &str) -> HandlerRequest {
        HandlerRequest::Cancel {
            ctx: RequestContext::new(),
            request: CancelOperationRequest {
                operation: operation.to_string(),
                operation_id: "id".to_string(),
                options: CancelOperationOptions::default(),
            },
        }
    }

    #[test]
    fn request_accessors() {
        let req = cancel_request("op");
        assert_eq!(req.operation(), "op");
        assert_eq!(req.method(), "cancel_operation");
        assert!(!req.ctx().is_cancelled());
    }

    #[tokio::test]
    async fn forwards_to_handler() {
        let svc = HandlerService::new(Arc::new(InfoOnly));
        let resp = svc.clone().oneshot(cancel_request("op")).await.unwrap();
        assert!(matches!(resp, HandlerResponse::Canceled));

        let resp = svc
            .oneshot(HandlerRequest::GetInfo {
                ctx: RequestContext::new(),
                request: GetOperationInfoRequest {
                    operation: "op".into(),
                    operation_id: "f/o/o".into(),
                    options: nexus_core::GetOperationInfoOptions::default(),
                },
            })
            .await
            .unwrap();
        assert!(matches!(resp, HandlerResponse::Info(info) if info.id == "f/o/o"));
    }

    #[tokio::test]
    async fn trait_defaults_surface_as_not_implemented() {
        let handler: Arc<dyn Handler> = Arc::new(InfoOnly);
        let svc = HandlerService::new(handler);
        let err = svc
            .oneshot(HandlerRequest::MapCompletion {
                ctx: RequestContext::new(),
                request: MapCompletionRequest {
                    operation: "op".into(),
                    completion: OperationCompletion::Successful(Message::empty()),
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OperationError::Handler(h) if h.kind == HandlerErrorType::NotImplemented
        ));
    }
}
