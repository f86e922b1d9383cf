//! Request-scoped cancellation and deadlines shared by handlers and transports.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{HandlerError, HandlerErrorType};

/// Per-request context carrying cancellation and deadline.
///
/// Threaded through every dispatch call. Decoding, handler invocation and
/// encoding all run under [`RequestContext::run`], so a canceled or expired
/// caller aborts them instead of letting them continue unobserved.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that is never canceled and has no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context canceled together with `token`.
    #[must_use]
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancellation: token,
            deadline: None,
        }
    }

    /// Sets the deadline, keeping the earlier one if a deadline is already set.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Shorthand for a deadline `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// A context canceled when this one is, but cancelable on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            deadline: self.deadline,
        }
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Drives `fut` until it completes, the context is canceled, or the deadline passes.
    ///
    /// # Errors
    ///
    /// `RequestCanceled` if the context was canceled first, `UpstreamTimeout`
    /// if the deadline passed first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, HandlerError> {
        if self.cancellation.is_cancelled() {
            return Err(canceled());
        }
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            () = self.cancellation.cancelled() => Err(canceled()),
            () = expired => Err(HandlerError::new(
                HandlerErrorType::UpstreamTimeout,
                "request deadline exceeded",
            )),
            output = fut => Ok(output),
        }
    }
}

fn canceled() -> HandlerError {
    HandlerError::new(HandlerErrorType::RequestCanceled, "request canceled")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_returns_output() {
        let ctx = RequestContext::new();
        assert_eq!(ctx.run(async { 7 }).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn canceled_context_aborts_before_polling() {
        let ctx = RequestContext::new();
        ctx.cancel();
        let err = ctx.run(async { 7 }).await.unwrap_err();
        assert_eq!(err.kind, HandlerErrorType::RequestCanceled);
    }

    #[tokio::test]
    async fn cancel_aborts_in_flight_future() {
        let ctx = RequestContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });
        let err = ctx
            .run(std::future::pending::<()>())
            .await
            .unwrap_err();
        assert_eq!(err.kind, HandlerErrorType::RequestCanceled);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_aborts_with_upstream_timeout() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        let err = ctx
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await
            .unwrap_err();
        assert_eq!(err.kind, HandlerErrorType::UpstreamTimeout);
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let ctx = RequestContext::new()
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(10));
        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn child_is_canceled_with_parent_but_not_vice_versa() {
        let parent = RequestContext::new();
        let child = parent.child();
        child.cancel();
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert!(other.is_cancelled());
    }
}
