//! Execution context for stages and producers
//!
//! An `ExecContext` carries a cancellation token and an optional deadline.
//! It is threaded through every stage and producer call so that a run can be
//! abandoned cooperatively once the caller gives up or the time budget is
//! spent.

use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Context passed to stages and producers during execution
///
/// Child contexts share cancellation with their parent (cancelling the parent
/// cancels every child) and may only tighten the deadline, never extend it.
///
/// # Example
///
/// ```
/// use agent_core::ExecContext;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let ctx = ExecContext::new().with_timeout(Duration::from_secs(5));
/// let stage_ctx = ctx.child_with_timeout(Duration::from_secs(1));
///
/// assert!(stage_ctx.deadline() <= ctx.deadline());
/// assert!(!stage_ctx.is_cancelled());
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecContext {
    /// Create a context with a fresh token and no deadline
    pub fn new() -> Self {
        Self::default()
    }

    // =========== Builder Methods ===========

    /// Set a deadline `timeout` from now, keeping any earlier deadline
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Set an absolute deadline, keeping any earlier deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    // =========== Derived Contexts ===========

    /// Create a child context that is cancelled together with this one
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Create a child context whose deadline is at most `timeout` from now
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.child().with_timeout(timeout)
    }

    // =========== Accessors ===========

    /// The cancellation token of this context
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel this context and every child derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when no deadline is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fail fast when the context is already cancelled or past its deadline
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.is_expired() {
            return Err(Error::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` to completion unless the context is cancelled or the
    /// deadline elapses first
    ///
    /// Cancellation wins over a simultaneously ready future.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output>
    where
        F: Future,
    {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => Err(Error::Cancelled),
                    result = tokio::time::timeout_at(deadline, fut) => {
                        result.map_err(|_| Error::DeadlineExceeded)
                    }
                }
            }
            None => {
                tokio::select! {
                    biased;
                    () = self.token.cancelled() => Err(Error::Cancelled),
                    output = fut => Ok(output),
                }
            }
        }
    }
}
