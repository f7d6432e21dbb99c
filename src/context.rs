//! # Cancellation context.
//!
//! [`Context`] carries cancellation and an optional deadline down a tree of
//! activities. It wraps a [`CancellationToken`] and additionally records *why*
//! it ended ([`ContextError`]), so an activity can tell an explicit
//! cancellation apart from an elapsed deadline.
//!
//! ```text
//! root (Context::new)
//!   ├─► child()            ── cancelled by root or explicitly
//!   └─► with_timeout(5ms)  ── ends with DeadlineExceeded after 5ms
//!          └─► child()     ── reports the parent's cause
//! ```
//!
//! ## Rules
//! - The first recorded cause wins; later `cancel()` calls are no-ops.
//! - A derived context never outlives its parent's deadline.
//! - Deadline timers are spawned on the Tokio runtime, so deadline-carrying
//!   contexts must be created from within a runtime.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::ContextError;

struct Inner {
    token: CancellationToken,
    deadline: Option<Instant>,
    cause: OnceLock<ContextError>,
    parent: Option<Context>,
}

/// Cancellation scope handed to every [`Runner`](crate::Runner).
///
/// Cheap to clone; clones share the same cancellation state.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// Creates a new cancellable root context.
    pub fn new() -> Self {
        Self::from_parts(CancellationToken::new(), None, None)
    }

    fn from_parts(
        token: CancellationToken,
        deadline: Option<Instant>,
        parent: Option<Context>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                token,
                deadline,
                cause: OnceLock::new(),
                parent,
            }),
        }
    }

    /// Derives a context that ends when `self` ends or when it is cancelled itself.
    pub fn child(&self) -> Self {
        Self::from_parts(
            self.inner.token.child_token(),
            self.inner.deadline,
            Some(self.clone()),
        )
    }

    /// Derives a context that ends with [`ContextError::DeadlineExceeded`] after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a context that ends with [`ContextError::DeadlineExceeded`] at `deadline`.
    ///
    /// If the parent already has an earlier deadline, the parent's one applies.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let inherited = self.inner.deadline.filter(|d| *d <= deadline);
        if inherited.is_some() {
            return self.child();
        }

        let ctx = Self::from_parts(
            self.inner.token.child_token(),
            Some(deadline),
            Some(self.clone()),
        );
        if deadline <= Instant::now() {
            ctx.end(ContextError::DeadlineExceeded);
        } else if !ctx.is_done() {
            let timer = ctx.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = time::sleep_until(deadline) => timer.end(ContextError::DeadlineExceeded),
                    _ = timer.inner.token.cancelled() => {}
                }
            });
        }
        ctx
    }

    /// Cancels this context and every context derived from it.
    pub fn cancel(&self) {
        self.end(ContextError::Canceled);
    }

    fn end(&self, cause: ContextError) {
        // Record before cancelling so observers woken by the token see the cause.
        let _ = self.inner.cause.set(cause);
        self.inner.token.cancel();
    }

    /// Returns why the context ended, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if !self.inner.token.is_cancelled() {
            return None;
        }
        if let Some(cause) = self.inner.cause.get() {
            return Some(*cause);
        }
        Some(
            self.inner
                .parent
                .as_ref()
                .and_then(Context::err)
                .unwrap_or(ContextError::Canceled),
        )
    }

    /// Returns `true` once the context ended.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Completes when the context ends.
    pub async fn done(&self) {
        self.inner.token.cancelled().await
    }

    /// Returns the deadline, if any.
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Underlying cancellation token (for interop with token-based APIs).
    #[inline]
    pub fn token(&self) -> &CancellationToken {
        &self.inner.token
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl From<CancellationToken> for Context {
    fn from(token: CancellationToken) -> Self {
        Self::from_parts(token, None, None)
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("err", &self.err())
            .finish()
    }
}

/// Sleeps for `duration` unless `ctx` ends first.
///
/// Returns `Ok(())` if the full duration elapsed, otherwise the context error.
pub async fn sleep(ctx: &Context, duration: Duration) -> Result<(), ContextError> {
    sleep_until(ctx, Instant::now() + duration).await
}

/// Sleeps until `deadline` unless `ctx` ends first.
pub async fn sleep_until(ctx: &Context, deadline: Instant) -> Result<(), ContextError> {
    tokio::select! {
        biased;
        _ = ctx.done() => Err(ctx.err().unwrap_or(ContextError::Canceled)),
        _ = time::sleep_until(deadline) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_propagates_to_children() {
        let root = Context::new();
        let child = root.child();
        let grandchild = child.child();

        assert_eq!(grandchild.err(), None);
        root.cancel();

        assert_eq!(child.err(), Some(ContextError::Canceled));
        assert_eq!(grandchild.err(), Some(ContextError::Canceled));
    }

    #[tokio::test]
    async fn child_cancel_does_not_affect_parent() {
        let root = Context::new();
        let child = root.child();
        child.cancel();

        assert!(child.is_done());
        assert!(!root.is_done());
    }

    #[tokio::test]
    async fn deadline_is_reported_as_exceeded() {
        let ctx = Context::new().with_timeout(Duration::from_millis(5));
        ctx.done().await;
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn children_inherit_deadline_cause() {
        let parent = Context::new().with_timeout(Duration::from_millis(5));
        let child = parent.with_timeout(Duration::from_secs(60));

        assert_eq!(child.deadline(), parent.deadline());
        child.done().await;
        assert_eq!(child.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn first_cause_wins() {
        let ctx = Context::new().with_timeout(Duration::from_secs(60));
        ctx.cancel();
        ctx.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Canceled));
    }

    #[tokio::test]
    async fn sleep_until_respects_deadline() {
        let started = Instant::now();
        let target = started + Duration::from_millis(50);
        assert_eq!(sleep_until(&Context::new(), target).await, Ok(()));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn sleep_is_cut_short_by_cancellation() {
        let ctx = Context::new();
        ctx.cancel();
        assert_eq!(
            sleep(&ctx, Duration::from_secs(60)).await,
            Err(ContextError::Canceled)
        );
    }
}
