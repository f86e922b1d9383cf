//! Service-level routing: dispatches each protocol method to the operation
//! registered under the request's name.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::FutureExt;
use nexus_core::{
    CancelOperationRequest, Codec, GetOperationInfoRequest, GetOperationResultRequest, Handler,
    HandlerError, MapCompletionRequest, Message, OperationCompletion, OperationError,
    OperationInfo, RequestContext, StartOperationRequest, StartOperationResponse,
};
use tracing::{info_span, warn, Instrument};

use super::adapter::UntypedOperationHandler;

/// Construction options of a [`ServiceHandler`].
#[derive(Default)]
pub struct ServiceHandlerOptions {
    pub operations: Vec<Arc<dyn UntypedOperationHandler>>,
    /// Codec used by every adapter call. Defaults to [`Codec::default`].
    pub codec: Codec,
}

/// Errors building a [`ServiceHandler`].
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Every name registered more than once, sorted.
    #[error("duplicate operations: {}", .0.join(", "))]
    DuplicateOperations(Vec<String>),
}

// ---------------------------------------------------------------------------
// ServiceHandler
// ---------------------------------------------------------------------------

/// Routes protocol calls to named operations.
///
/// The operation map is built once and never mutated, so dispatch takes no
/// locks. Unknown names yield `NotFound`; a panic inside an operation is
/// caught and reported as `Internal`.
pub struct ServiceHandler {
    operations: HashMap<String, Arc<dyn UntypedOperationHandler>>,
    codec: Codec,
}

impl ServiceHandler {
    /// Builds the router.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateOperations` listing every name registered more than once.
    pub fn new(options: ServiceHandlerOptions) -> Result<Self, ServiceError> {
        let mut operations = HashMap::with_capacity(options.operations.len());
        let mut duplicates = BTreeSet::new();

        for op in options.operations {
            let name = op.name().to_string();
            if operations.contains_key(&name) {
                duplicates.insert(name);
            } else {
                operations.insert(name, op);
            }
        }
        if !duplicates.is_empty() {
            return Err(ServiceError::DuplicateOperations(duplicates.into_iter().collect()));
        }

        Ok(Self {
            operations,
            codec: options.codec,
        })
    }

    #[must_use]
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Registered operation names, sorted.
    #[must_use]
    pub fn operation_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn lookup(&self, name: &str) -> Result<&Arc<dyn UntypedOperationHandler>, OperationError> {
        self.operations
            .get(name)
            .ok_or_else(|| HandlerError::not_found(format!("operation {name:?} not found")).into())
    }
}

impl std::fmt::Debug for ServiceHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandler")
            .field("operations", &self.operation_names())
            .field("codec", &self.codec)
            .finish()
    }
}

/// Runs an adapter call, turning a panic into an `Internal` handler error.
async fn guarded<T>(
    method: &'static str,
    fut: impl Future<Output = Result<T, OperationError>>,
) -> Result<T, OperationError> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(ToString::to_string)
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            warn!(method, panic = %detail, "operation handler panicked");
            Err(HandlerError::internal(format!("operation handler panicked: {detail}")).into())
        }
    }
}

#[async_trait]
impl Handler for ServiceHandler {
    async fn start_operation(
        &self,
        ctx: &RequestContext,
        request: StartOperationRequest,
    ) -> Result<StartOperationResponse, OperationError> {
        let span = info_span!(
            "dispatch",
            operation = %request.operation,
            method = "start_operation"
        );
        let op = self.lookup(&request.operation)?;
        guarded("start_operation", op.start_operation(ctx, &self.codec, request))
            .instrument(span)
            .await
    }

    async fn cancel_operation(
        &self,
        ctx: &RequestContext,
        request: CancelOperationRequest,
    ) -> Result<(), OperationError> {
        let span = info_span!(
            "dispatch",
            operation = %request.operation,
            method = "cancel_operation"
        );
        let op = self.lookup(&request.operation)?;
        guarded("cancel_operation", op.cancel_operation(ctx, &self.codec, request))
            .instrument(span)
            .await
    }

    async fn get_operation_info(
        &self,
        ctx: &RequestContext,
        request: GetOperationInfoRequest,
    ) -> Result<OperationInfo, OperationError> {
        let span = info_span!(
            "dispatch",
            operation = %request.operation,
            method = "get_operation_info"
        );
        let op = self.lookup(&request.operation)?;
        guarded("get_operation_info", op.get_operation_info(ctx, &self.codec, request))
            .instrument(span)
            .await
    }

    async fn get_operation_result(
        &self,
        ctx: &RequestContext,
        request: GetOperationResultRequest,
    ) -> Result<Message, OperationError> {
        let span = info_span!(
            "dispatch",
            operation = %request.operation,
            method = "get_operation_result"
        );
        let op = self.lookup(&request.operation)?;
        guarded("get_operation_result", op.get_operation_result(ctx, &self.codec, request))
            .instrument(span)
            .await
    }

    async fn map_completion(
        &self,
        ctx: &RequestContext,
        request: MapCompletionRequest,
    ) -> Result<OperationCompletion, OperationError> {
        let span = info_span!(
            "dispatch",
            operation = %request.operation,
            method = "map_completion"
        );
        let op = self.lookup(&request.operation)?;
        guarded("map_completion", op.map_completion(ctx, &self.codec, request))
            .instrument(span)
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use dashmap::DashMap;
    use nexus_core::{
        CancelOperationOptions, Failure, GetOperationInfoOptions, GetOperationResultOptions,
        HandlerErrorType, OperationState, StartOperationOptions, UnsuccessfulOperationError,
    };

    use super::*;
    use crate::service::operation::{AsyncOperation, AsyncOperationHandler, SyncOperation};

    fn number_validator() -> Arc<dyn UntypedOperationHandler> {
        Arc::new(SyncOperation::new(
            "number-validator",
            |_ctx, input: i64, _options| async move {
                if input == 0 {
                    return Err(OperationError::Application(anyhow::anyhow!("cannot process 0")));
                }
                Ok(input)
            },
        ))
    }

    /// Async handler backed by a concurrent map of token -> state.
    #[derive(Default)]
    struct Jobs {
        next: AtomicU64,
        states: DashMap<String, OperationState>,
        canceled: DashMap<String, String>,
    }

    #[async_trait]
    impl AsyncOperationHandler for Jobs {
        type Input = String;
        type Output = String;

        async fn start(
            &self,
            _ctx: &RequestContext,
            input: String,
            _options: StartOperationOptions,
        ) -> Result<String, OperationError> {
            let id = if input.is_empty() {
                format!("job-{}", self.next.fetch_add(1, Ordering::SeqCst))
            } else {
                input
            };
            self.states.insert(id.clone(), OperationState::Running);
            Ok(id)
        }

        async fn cancel(
            &self,
            _ctx: &RequestContext,
            operation_id: &str,
            options: CancelOperationOptions,
        ) -> Result<(), OperationError> {
            let mut state = self
                .states
                .get_mut(operation_id)
                .ok_or_else(|| HandlerError::not_found("unknown token"))?;
            *state = OperationState::Canceled;
            let marker = options
                .header
                .get("x-marker")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            self.canceled.insert(operation_id.to_string(), marker);
            Ok(())
        }

        async fn get_info(
            &self,
            _ctx: &RequestContext,
            operation_id: &str,
            _options: GetOperationInfoOptions,
        ) -> Result<OperationInfo, OperationError> {
            let state = self
                .states
                .get(operation_id)
                .ok_or_else(|| HandlerError::not_found("unknown token"))?;
            Ok(OperationInfo::new(operation_id, *state))
        }

        async fn get_result(
            &self,
            _ctx: &RequestContext,
            operation_id: &str,
            _options: GetOperationResultOptions,
        ) -> Result<String, OperationError> {
            let state = *self
                .states
                .get(operation_id)
                .ok_or_else(|| HandlerError::not_found("unknown token"))?;
            match state {
                OperationState::Canceled => {
                    Err(UnsuccessfulOperationError::canceled(Failure::new("canceled")).into())
                }
                OperationState::Succeeded => Ok(format!("result of {operation_id}")),
                _ => Err(OperationError::StillRunning),
            }
        }
    }

    fn service(jobs: Jobs) -> ServiceHandler {
        ServiceHandler::new(ServiceHandlerOptions {
            operations: vec![number_validator(), Arc::new(AsyncOperation::new("jobs", jobs))],
            ..ServiceHandlerOptions::default()
        })
        .unwrap()
    }

    fn start(
        service: &ServiceHandler,
        operation: &str,
        input: &(impl serde::Serialize + Send + Sync + 'static),
    ) -> StartOperationRequest {
        StartOperationRequest {
            operation: operation.to_string(),
            input: service.codec().encode(input).unwrap(),
            options: StartOperationOptions::default(),
        }
    }

    fn kind(err: &OperationError) -> Option<HandlerErrorType> {
        match err {
            OperationError::Handler(h) => Some(h.kind),
            _ => None,
        }
    }

    #[test]
    fn duplicates_fail_construction() {
        let err = ServiceHandler::new(ServiceHandlerOptions {
            operations: vec![
                number_validator(),
                number_validator(),
                Arc::new(AsyncOperation::new("jobs", Jobs::default())),
                Arc::new(AsyncOperation::new("jobs", Jobs::default())),
                number_validator(),
            ],
            ..ServiceHandlerOptions::default()
        })
        .unwrap_err();
        let ServiceError::DuplicateOperations(names) = &err;
        assert_eq!(names, &["jobs", "number-validator"]);
        assert_eq!(err.to_string(), "duplicate operations: jobs, number-validator");
    }

    #[test]
    fn empty_service_is_allowed() {
        let service = ServiceHandler::new(ServiceHandlerOptions::default()).unwrap();
        assert!(service.operation_names().is_empty());
    }

    #[tokio::test]
    async fn number_validator_scenario() {
        let service = service(Jobs::default());
        let ctx = RequestContext::new();

        let response = service
            .start_operation(&ctx, start(&service, "number-validator", &3i64))
            .await
            .unwrap();
        let StartOperationResponse::Sync(message) = response else {
            panic!("expected a synchronous response");
        };
        assert_eq!(service.codec().decode::<i64>(message).unwrap(), 3);

        let err = service
            .start_operation(&ctx, start(&service, "number-validator", &0i64))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OperationError::Unsuccessful(ref u) if u.state() == OperationState::Failed
        ));

        let err = service
            .start_operation(&ctx, start(&service, "missing", &3i64))
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(HandlerErrorType::NotFound));
    }

    #[tokio::test]
    async fn unknown_name_is_not_found_for_every_method() {
        let service = service(Jobs::default());
        let ctx = RequestContext::new();
        let missing = || "missing".to_string();

        let err = service
            .cancel_operation(&ctx, CancelOperationRequest {
                operation: missing(),
                operation_id: "id".into(),
                options: CancelOperationOptions::default(),
            })
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(HandlerErrorType::NotFound));

        let err = service
            .get_operation_info(&ctx, GetOperationInfoRequest {
                operation: missing(),
                operation_id: "id".into(),
                options: GetOperationInfoOptions::default(),
            })
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(HandlerErrorType::NotFound));

        let err = service
            .get_operation_result(&ctx, GetOperationResultRequest {
                operation: missing(),
                operation_id: "id".into(),
                options: GetOperationResultOptions::default(),
            })
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(HandlerErrorType::NotFound));

        let err = service
            .map_completion(&ctx, MapCompletionRequest {
                operation: missing(),
                completion: OperationCompletion::Successful(Message::empty()),
            })
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(HandlerErrorType::NotFound));
    }

    #[tokio::test]
    async fn sync_operation_lacks_async_methods() {
        let service = service(Jobs::default());
        let err = service
            .get_operation_info(&RequestContext::new(), GetOperationInfoRequest {
                operation: "number-validator".into(),
                operation_id: "id".into(),
                options: GetOperationInfoOptions::default(),
            })
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(HandlerErrorType::NotImplemented));
    }

    #[tokio::test]
    async fn async_lifecycle_through_router() {
        let service = service(Jobs::default());
        let ctx = RequestContext::new();

        let response = service
            .start_operation(&ctx, start(&service, "jobs", &"escape/me"))
            .await
            .unwrap();
        let StartOperationResponse::Async { operation_id } = response else {
            panic!("expected an asynchronous response");
        };
        assert_eq!(operation_id, "escape/me");

        let info = service
            .get_operation_info(&ctx, GetOperationInfoRequest {
                operation: "jobs".into(),
                operation_id: operation_id.clone(),
                options: GetOperationInfoOptions::default(),
            })
            .await
            .unwrap();
        assert_eq!(info, OperationInfo::new("escape/me", OperationState::Running));

        let err = service
            .get_operation_result(&ctx, GetOperationResultRequest {
                operation: "jobs".into(),
                operation_id: operation_id.clone(),
                options: GetOperationResultOptions::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::StillRunning));

        service
            .cancel_operation(&ctx, CancelOperationRequest {
                operation: "jobs".into(),
                operation_id: operation_id.clone(),
                options: CancelOperationOptions::default(),
            })
            .await
            .unwrap();

        let err = service
            .get_operation_result(&ctx, GetOperationResultRequest {
                operation: "jobs".into(),
                operation_id,
                options: GetOperationResultOptions::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OperationError::Unsuccessful(ref u) if u.state() == OperationState::Canceled
        ));
    }

    #[tokio::test]
    async fn cancel_unknown_token_is_not_found() {
        let service = service(Jobs::default());
        let err = service
            .cancel_operation(&RequestContext::new(), CancelOperationRequest {
                operation: "jobs".into(),
                operation_id: "never-started".into(),
                options: CancelOperationOptions::default(),
            })
            .await
            .unwrap_err();
        assert_eq!(kind(&err), Some(HandlerErrorType::NotFound));
    }

    #[tokio::test]
    async fn map_completion_maps_both_outcomes() {
        let service = service(Jobs::default());
        let ctx = RequestContext::new();

        let mapped = service
            .map_completion(&ctx, MapCompletionRequest {
                operation: "jobs".into(),
                completion: OperationCompletion::Successful(
                    service.codec().encode(&"done").unwrap(),
                ),
            })
            .await
            .unwrap();
        let OperationCompletion::Successful(message) = mapped else {
            panic!("expected a successful completion");
        };
        assert_eq!(service.codec().decode::<String>(message).unwrap(), "done");

        let mapped = service
            .map_completion(&ctx, MapCompletionRequest {
                operation: "jobs".into(),
                completion: OperationCompletion::Unsuccessful(UnsuccessfulOperationError::failed(
                    Failure::new("intentional"),
                )),
            })
            .await
            .unwrap();
        assert!(matches!(
            mapped,
            OperationCompletion::Unsuccessful(ref u) if u.state() == OperationState::Failed
        ));
    }

    #[tokio::test]
    async fn panics_are_internal_errors() {
        let service = ServiceHandler::new(ServiceHandlerOptions {
            operations: vec![Arc::new(SyncOperation::new(
                "explode",
                |_ctx, input: i64, _options| async move {
                    if input > 0 {
                        panic!("boom");
                    }
                    Ok::<_, OperationError>(input)
                },
            ))],
            ..ServiceHandlerOptions::default()
        })
        .unwrap();
        let err = service
            .start_operation(&RequestContext::new(), start(&service, "explode", &1i64))
            .await
            .unwrap_err();
        let OperationError::Handler(handler_error) = err else {
            panic!("expected a handler error");
        };
        assert_eq!(handler_error.kind, HandlerErrorType::Internal);
        assert!(handler_error.failure.message.contains("boom"));
    }
}
