//! # CronJob: a periodic job as a long-lived activity.
//!
//! ```text
//! CronJob::run(ctx)
//!   schedule = parse(expr)      (invalid ─► Err before anything runs)
//!   job = factory()
//!   dispatcher.add(schedule, job) ─► start(ctx)
//!   wait for {
//!     ctx ended         ─► Err(Context)
//!     close()           ─► Ok
//!     first job error   ─► Err(Job)
//!   }
//!   dispatcher.stop().await     (in-flight tick drained)
//!   job.close(ctx)              (exactly once)
//!   close error ─► result if nothing failed before, reported otherwise
//! ```

mod dispatcher;
mod schedule;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::error::{ContextError, Error};
use crate::events::{Event, EventKind};
use crate::runner::{Activity, Closer, Runner};
use crate::subscribers::SubscriberSet;

pub use dispatcher::{Drain, TickDispatcher};
pub use schedule::Schedule;

type Factory = dyn Fn() -> Activity + Send + Sync;

/// Runs a freshly built job on a schedule until cancelled, closed or failed.
pub struct CronJob {
    name: Arc<str>,
    expr: Arc<str>,
    factory: Arc<Factory>,
    closed: CancellationToken,
    subs: SubscriberSet,
}

impl CronJob {
    /// Creates a cron activity; `factory` builds the job once per `run`.
    ///
    /// The expression is validated when `run` starts.
    pub fn new<F>(factory: F, expr: impl Into<Arc<str>>) -> Self
    where
        F: Fn() -> Activity + Send + Sync + 'static,
    {
        Self {
            name: Arc::from("cronjob"),
            expr: expr.into(),
            factory: Arc::new(factory),
            closed: CancellationToken::new(),
            subs: SubscriberSet::default(),
        }
    }

    /// Renames the activity (used as `source` in close reports).
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the subscribers tick and close events are reported to.
    pub fn with_subscribers(mut self, subs: SubscriberSet) -> Self {
        self.subs = subs;
        self
    }

    /// The schedule expression.
    pub fn expr(&self) -> &str {
        &self.expr
    }
}

impl std::fmt::Debug for CronJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CronJob")
            .field("name", &self.name)
            .field("expr", &self.expr)
            .field("closed", &self.closed.is_cancelled())
            .finish()
    }
}

/// Forwards the job's first error (a panic included) to the waiting `run`.
struct FirstFailure {
    job: Activity,
    tx: mpsc::Sender<Error>,
}

#[async_trait]
impl Runner for FirstFailure {
    async fn run(&self, ctx: Context) -> Result<(), Error> {
        let res = AssertUnwindSafe(self.job.run(ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(Error::Panicked {
                    task: self.job.name().to_string(),
                })
            });
        if let Err(err) = &res {
            let _ = self.tx.try_send(err.clone());
        }
        res
    }

    fn name(&self) -> &str {
        self.job.name()
    }
}

#[async_trait]
impl Runner for CronJob {
    async fn run(&self, ctx: Context) -> Result<(), Error> {
        let schedule = Schedule::parse(&self.expr)?;
        let job = (self.factory)();
        let (tx, mut failures) = mpsc::channel(1);

        let mut dispatcher = TickDispatcher::new().with_subscribers(self.subs.clone());
        dispatcher.add(
            schedule,
            Arc::new(FirstFailure {
                job: job.clone(),
                tx,
            }),
        );
        dispatcher.start(&ctx);

        let res = tokio::select! {
            biased;
            _ = ctx.done() => Err(Error::from(ctx.err().unwrap_or(ContextError::Canceled))),
            _ = self.closed.cancelled() => Ok(()),
            Some(err) = failures.recv() => Err(Error::Job { source: Box::new(err) }),
        };

        dispatcher.stop().await;

        match (res, job.close(ctx).await) {
            (res, Ok(())) => res,
            (Ok(()), Err(close_err)) => Err(Error::Close {
                source: Box::new(close_err),
            }),
            (Err(err), Err(close_err)) => {
                self.subs.emit(
                    &Event::new(EventKind::CloseFailed)
                        .with_source(Arc::clone(&self.name))
                        .with_task(job.name())
                        .with_reason(close_err.to_string()),
                );
                Err(err)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl Closer for CronJob {
    async fn close(&self, _ctx: Context) -> Result<(), Error> {
        self.closed.cancel();
        Ok(())
    }
}
