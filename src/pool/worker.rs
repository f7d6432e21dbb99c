//! # WorkerPool: semaphore-bounded task execution.
//!
//! ```text
//! schedule(ctx, task)
//!   select (biased) {
//!     ctx ended        ─► spawn task.run(ctx),    result dropped ─► Err(ctx)
//!     pool ctx ended   ─► spawn task.run(parent), result dropped ─► Err(parent)
//!     permit acquired  ─► spawn { span "task" ─► task.run(parent.child()) ─► drop permit } ─► Ok
//!   }
//! ```
//!
//! ## Rules
//! - At most `capacity` admitted tasks run at once; the permit lives as long
//!   as the task does.
//! - Admitted tasks run under a child of the pool's context, not the
//!   submission context: the submitter only controls admission.
//! - Failures of admitted tasks are reported ([`EventKind::TaskFailed`]),
//!   never returned by `schedule`.
//! - A task that is not admitted still gets one invocation with the ended
//!   context, detached from the submitter: `schedule` returns as soon as the
//!   context ends, whatever the task does with it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::select;
use tokio::sync::Semaphore;
use tracing::{Instrument, Span};

use crate::context::Context;
use crate::error::{ContextError, Error};
use crate::events::{Event, EventKind};
use crate::group::attempt;
use crate::runner::Runner;
use crate::subscribers::SubscriberSet;

use super::{Scheduler, Size};

/// Fixed-capacity pool of concurrently running tasks.
#[derive(Debug)]
pub struct WorkerPool {
    name: Arc<str>,
    parent: Context,
    sem: Arc<Semaphore>,
    capacity: usize,
    subs: SubscriberSet,
}

impl WorkerPool {
    /// Creates a pool open until `parent` ends.
    pub fn new(parent: &Context, size: Size) -> Self {
        let capacity = size.resolve();
        Self {
            name: Arc::from("pool"),
            parent: parent.clone(),
            sem: Arc::new(Semaphore::new(capacity)),
            capacity,
            subs: SubscriberSet::default(),
        }
    }

    /// Renames the pool (used for spans and reports).
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces the subscribers task failures are reported to.
    pub fn with_subscribers(mut self, subs: SubscriberSet) -> Self {
        self.subs = subs;
        self
    }

    /// Maximum number of concurrently admitted tasks.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of admitted tasks currently running.
    pub fn in_flight(&self) -> usize {
        self.capacity - self.sem.available_permits()
    }

    fn reject(&self, ended: Context, task: Arc<dyn Runner>) -> Result<(), Error> {
        let cause = ended.err().unwrap_or(ContextError::Canceled);
        self.subs.emit(
            &Event::new(EventKind::TaskRejected)
                .with_source(Arc::clone(&self.name))
                .with_task(task.name())
                .with_reason(cause.to_string()),
        );

        let span = tracing::debug_span!(
            parent: &Span::current(),
            "rejected",
            pool = %self.name,
            task = task.name()
        );
        tokio::spawn(
            async move {
                let _ = task.run(ended).await;
            }
            .instrument(span),
        );
        Err(cause.into())
    }
}

#[async_trait]
impl Scheduler for WorkerPool {
    async fn schedule(&self, ctx: &Context, task: Arc<dyn Runner>) -> Result<(), Error> {
        let permit_future = Arc::clone(&self.sem).acquire_owned();
        tokio::pin!(permit_future);

        let permit = select! {
            biased;
            _ = ctx.done() => return self.reject(ctx.clone(), task),
            _ = self.parent.done() => return self.reject(self.parent.clone(), task),
            res = &mut permit_future => match res {
                Ok(permit) => permit,
                // The semaphore is never closed; treat it like the pool ending.
                Err(_closed) => return self.reject(self.parent.clone(), task),
            },
        };

        let exec = self.parent.child();
        let name = Arc::clone(&self.name);
        let subs = self.subs.clone();
        let span = tracing::info_span!(
            parent: &Span::current(),
            "task",
            pool = %name,
            task = task.name()
        );

        tokio::spawn(
            async move {
                let _permit = permit;
                attempt(&name, &subs, &task, exec.clone()).await;
                exec.cancel();
            }
            .instrument(span),
        );
        Ok(())
    }
}
