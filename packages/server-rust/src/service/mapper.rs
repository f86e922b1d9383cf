//! Composable result mappers for asynchronous operations.
//!
//! A [`ResultMapper`] turns the outcome of one stage into the input of the
//! next. Mappers are chained into a [`ResultPipeline`], which runs them in
//! order: a terminal failure flows to the next stage as its `Err` input,
//! while a handler or application error aborts the pipeline.

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use nexus_core::{OperationError, RequestContext, UnsuccessfulOperationError};
use tracing::warn;

// ---------------------------------------------------------------------------
// ResultMapper
// ---------------------------------------------------------------------------

/// One stage of a result pipeline.
#[async_trait]
pub trait ResultMapper: Send + Sync + 'static {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Name reported by [`ResultPipeline::stage_names`].
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Maps the previous stage's outcome.
    ///
    /// Returning `Ok` for an `Err` input reclassifies a terminal failure as a
    /// success; the pipeline allows it but logs a warning.
    async fn map(
        &self,
        ctx: &RequestContext,
        result: Result<Self::Input, UnsuccessfulOperationError>,
    ) -> Result<Self::Output, OperationError>;
}

// ---------------------------------------------------------------------------
// MapOk
// ---------------------------------------------------------------------------

/// Maps successful values with a function; failures pass through untouched.
pub struct MapOk<I, O, F> {
    name: String,
    f: F,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O, F> MapOk<I, O, F> {
    #[must_use]
    pub fn new(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(I) -> Result<O, OperationError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<I, O, F> ResultMapper for MapOk<I, O, F>
where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Result<O, OperationError> + Send + Sync + 'static,
{
    type Input = I;
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    async fn map(
        &self,
        _ctx: &RequestContext,
        result: Result<I, UnsuccessfulOperationError>,
    ) -> Result<O, OperationError> {
        match result {
            Ok(value) => (self.f)(value),
            Err(unsuccessful) => Err(unsuccessful.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// ResultPipeline
// ---------------------------------------------------------------------------

type Stage<I, O> = Arc<
    dyn Fn(
            RequestContext,
            Result<I, UnsuccessfulOperationError>,
        ) -> BoxFuture<'static, Result<O, OperationError>>
        + Send
        + Sync,
>;

/// Ordered list of mapper stages from `I` to `O`.
pub struct ResultPipeline<I, O> {
    names: Vec<String>,
    run: Stage<I, O>,
}

impl<I, O> Clone for ResultPipeline<I, O> {
    fn clone(&self) -> Self {
        Self {
            names: self.names.clone(),
            run: Arc::clone(&self.run),
        }
    }
}

impl<T: Send + 'static> ResultPipeline<T, T> {
    /// A pipeline with no stages: successes and failures pass through as is.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            names: Vec::new(),
            run: Arc::new(
                |_ctx: RequestContext,
                 input: Result<T, UnsuccessfulOperationError>|
                 -> BoxFuture<'static, Result<T, OperationError>> {
                    Box::pin(async move { input.map_err(OperationError::from) })
                },
            ),
        }
    }
}

impl<I, O> ResultPipeline<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    /// Appends a stage.
    #[must_use]
    pub fn then<M>(self, mapper: M) -> ResultPipeline<I, M::Output>
    where
        M: ResultMapper<Input = O>,
    {
        let mut names = self.names;
        let stage_name = mapper.name().to_owned();
        names.push(stage_name.clone());

        let prev = self.run;
        let mapper = Arc::new(mapper);
        let stage_name: Arc<str> = stage_name.into();

        ResultPipeline {
            names,
            run: Arc::new(
                move |ctx: RequestContext,
                      input: Result<I, UnsuccessfulOperationError>|
                      -> BoxFuture<'static, Result<M::Output, OperationError>> {
                    let prev = Arc::clone(&prev);
                    let mapper = Arc::clone(&mapper);
                    let stage_name = Arc::clone(&stage_name);
                    Box::pin(async move {
                        let intermediate = match prev(ctx.clone(), input).await {
                            Ok(value) => Ok(value),
                            Err(OperationError::Unsuccessful(unsuccessful)) => Err(unsuccessful),
                            Err(other) => return Err(other),
                        };
                        let was_failure = intermediate.is_err();
                        let output = mapper.map(&ctx, intermediate).await;
                        if was_failure && output.is_ok() {
                            warn!(
                                stage = %stage_name,
                                "mapper reclassified a terminal failure as success"
                            );
                        }
                        output
                    })
                },
            ),
        }
    }

    /// Stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> &[String] {
        &self.names
    }

    /// Runs every stage in order.
    ///
    /// # Errors
    ///
    /// `Unsuccessful` when the final stage reports a terminal failure, or the
    /// first handler/application error raised by any stage.
    pub async fn run(
        &self,
        ctx: &RequestContext,
        input: Result<I, UnsuccessfulOperationError>,
    ) -> Result<O, OperationError> {
        (self.run)(ctx.clone(), input).await
    }
}

#[cfg(test)]
mod tests {
    use nexus_core::{Failure, HandlerError, OperationState};

    use super::*;

    /// Turns any failure into a fixed fallback value.
    struct Fallback;

    #[async_trait]
    impl ResultMapper for Fallback {
        type Input = String;
        type Output = String;

        fn name(&self) -> &str {
            "fallback"
        }

        async fn map(
            &self,
            _ctx: &RequestContext,
            result: Result<String, UnsuccessfulOperationError>,
        ) -> Result<String, OperationError> {
            Ok(result.unwrap_or_else(|_| "fallback".to_string()))
        }
    }

    fn failed() -> UnsuccessfulOperationError {
        UnsuccessfulOperationError::failed(Failure::new("boom"))
    }

    #[tokio::test]
    async fn identity_passes_both_outcomes() {
        let ctx = RequestContext::new();
        let pipeline = ResultPipeline::<i64, i64>::identity();
        assert!(pipeline.stage_names().is_empty());
        assert_eq!(pipeline.run(&ctx, Ok(4)).await.unwrap(), 4);
        let err = pipeline.run(&ctx, Err(failed())).await.unwrap_err();
        assert!(matches!(
            err,
            OperationError::Unsuccessful(u) if u.state() == OperationState::Failed
        ));
    }

    #[tokio::test]
    async fn stages_run_in_order() {
        let ctx = RequestContext::new();
        let pipeline = ResultPipeline::<i64, i64>::identity()
            .then(MapOk::new("double", |v: i64| Ok(v * 2)))
            .then(MapOk::new("to_string", |v: i64| Ok(v.to_string())))
            .then(MapOk::new("suffix", |v: String| Ok(format!("{v}!"))));
        assert_eq!(pipeline.stage_names(), ["double", "to_string", "suffix"]);
        assert_eq!(pipeline.run(&ctx, Ok(21)).await.unwrap(), "42!");
    }

    #[tokio::test]
    async fn failures_skip_map_ok_stages() {
        let ctx = RequestContext::new();
        let pipeline = ResultPipeline::<i64, i64>::identity()
            .then(MapOk::new("double", |v: i64| Ok(v * 2)));
        let err = pipeline.run(&ctx, Err(failed())).await.unwrap_err();
        assert!(matches!(err, OperationError::Unsuccessful(u) if u.failure().message == "boom"));
    }

    #[tokio::test]
    async fn unsuccessful_stage_output_flows_to_next_stage() {
        let ctx = RequestContext::new();
        let pipeline = ResultPipeline::<String, String>::identity()
            .then(MapOk::new("reject", |_: String| -> Result<String, OperationError> {
                Err(UnsuccessfulOperationError::canceled(Failure::new("no")).into())
            }))
            .then(Fallback);
        assert_eq!(pipeline.run(&ctx, Ok("x".into())).await.unwrap(), "fallback");
    }

    #[tokio::test]
    async fn handler_error_aborts_pipeline() {
        let ctx = RequestContext::new();
        let pipeline = ResultPipeline::<String, String>::identity()
            .then(MapOk::new("invalid", |_: String| -> Result<String, OperationError> {
                Err(HandlerError::bad_request("bad").into())
            }))
            .then(Fallback);
        let err = pipeline.run(&ctx, Ok("x".into())).await.unwrap_err();
        assert!(matches!(err, OperationError::Handler(_)));
    }
}
