//! # Bounded worker pool and its decorators.
//!
//! ```text
//! with_wait( WithTimeout::new(d, WorkerPool::new(&ctx, Size::Constant(n))) )
//!     │            │                   │
//!     │            │                   └─ at most n admitted tasks at once
//!     │            └─ deadline fixed at submission: now + d
//!     └─ Waiter::wait(): all submitted tasks done, first error
//! ```
//!
//! Every layer implements [`Scheduler`], so they compose in any order and
//! `Arc<dyn Scheduler>` can be handed to code that only submits work.

mod size;
mod timeout;
mod wait;
mod worker;

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Error;
use crate::runner::Runner;

pub use size::Size;
pub use timeout::WithTimeout;
pub use wait::{WithWait, Waiter, with_wait};
pub use worker::WorkerPool;

/// Submits tasks for asynchronous execution.
#[async_trait]
pub trait Scheduler: Send + Sync + 'static {
    /// Submits `task`, blocking until it is admitted or `ctx` ends.
    ///
    /// Returns `Ok(())` once the task has been handed off. The task's own
    /// result is not returned here; see [`with_wait`] to collect it. When
    /// `ctx` ends first, the task is still invoked once with the ended
    /// context so it can observe its stopping condition, and the context
    /// error is returned without waiting for that invocation.
    async fn schedule(&self, ctx: &Context, task: Arc<dyn Runner>) -> Result<(), Error>;
}

#[async_trait]
impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    async fn schedule(&self, ctx: &Context, task: Arc<dyn Runner>) -> Result<(), Error> {
        (**self).schedule(ctx, task).await
    }
}
