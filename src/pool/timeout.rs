use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::context::Context;
use crate::error::Error;
use crate::runner::Runner;

use super::Scheduler;

/// Bounds every submitted task by a deadline fixed at submission time.
///
/// The deadline (`now + timeout`) applies to both waiting for admission and
/// the task's execution: a task that waits long enough for a slot runs with
/// an already-ended context and sees [`ContextError::DeadlineExceeded`](crate::ContextError).
#[derive(Debug)]
pub struct WithTimeout<S> {
    timeout: Duration,
    inner: S,
}

impl<S: Scheduler> WithTimeout<S> {
    /// Wraps `inner` with a per-task `timeout`.
    pub fn new(timeout: Duration, inner: S) -> Self {
        Self { timeout, inner }
    }

    /// The configured per-task timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The wrapped scheduler.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Scheduler> Scheduler for WithTimeout<S> {
    async fn schedule(&self, ctx: &Context, task: Arc<dyn Runner>) -> Result<(), Error> {
        let deadline = Instant::now() + self.timeout;
        let submit = ctx.with_deadline(deadline);

        let res = self
            .inner
            .schedule(&submit, Arc::new(Deadlined { deadline, task }))
            .await;
        // Admission is decided; release the submission timer.
        submit.cancel();
        res
    }
}

struct Deadlined {
    deadline: Instant,
    task: Arc<dyn Runner>,
}

#[async_trait]
impl Runner for Deadlined {
    async fn run(&self, ctx: Context) -> Result<(), Error> {
        let ctx = ctx.with_deadline(self.deadline);
        let res = self.task.run(ctx.clone()).await;
        ctx.cancel();
        res
    }

    fn name(&self) -> &str {
        self.task.name()
    }
}
