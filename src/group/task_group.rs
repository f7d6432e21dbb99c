//! # TaskGroup: fire-and-forget activities behind a wait barrier.
//!
//! ```text
//! run(ctx, r)      ─► barrier += 1 ─► spawn ─► span "task" ─► r.run(ctx) ─► barrier -= 1
//! run_loop(ctx, r) ─► barrier += 1 ─► spawn ─► loop { span "task" ─► r.run(ctx) } ─► barrier -= 1
//! wait()           ─► until barrier == 0
//! ```
//!
//! ## Error policy
//! - Any error other than an explicit cancellation is reported as
//!   [`EventKind::TaskFailed`] and swallowed; the caller only sees it through
//!   subscribers. An elapsed deadline counts as a failure.
//! - [`ContextError::Canceled`](crate::ContextError) is suppressed, even from subscribers.
//! - A panic is contained and reported as [`EventKind::TaskPanicked`].
//!
//! ## Rules
//! - One barrier increment per `run` and per `run_loop` (not per iteration).
//! - The barrier is released by a drop guard, so it stays balanced on unwind.
//! - `run_loop` stops after a reported failure or once `ctx` ended; a
//!   `Canceled` error returned while `ctx` is still live does not stop it.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{Instrument, Span};

use crate::context::Context;
use crate::events::{Event, EventKind};
use crate::runner::Runner;
use crate::subscribers::SubscriberSet;
use crate::sync::WaitGroup;

/// Name used by [`TaskGroup::default`].
pub const DEFAULT_GROUP_NAME: &str = "async.run";

/// Tracks a set of concurrently executing activities.
#[derive(Clone, Debug)]
pub struct TaskGroup {
    name: Arc<str>,
    wg: WaitGroup,
    subs: SubscriberSet,
}

impl TaskGroup {
    /// Creates a group reporting to the default [`LogWriter`](crate::LogWriter).
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::with_subscribers(name, SubscriberSet::default())
    }

    /// Creates a group reporting to `subs`.
    pub fn with_subscribers(name: impl Into<Arc<str>>, subs: SubscriberSet) -> Self {
        Self {
            name: name.into(),
            wg: WaitGroup::new(),
            subs,
        }
    }

    /// Group name (used for spans and reports).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs `runner` once, asynchronously.
    ///
    /// The runner executes in a new span parented on the caller's current span
    /// and receives `ctx` unchanged (deadlines pass through).
    pub fn run<R: Runner>(&self, ctx: &Context, runner: R) {
        let guard = self.wg.add();
        let ctx = ctx.clone();
        let name = Arc::clone(&self.name);
        let subs = self.subs.clone();
        let parent = Span::current();

        tokio::spawn(async move {
            let _guard = guard;
            let span = tracing::info_span!(
                parent: &parent,
                "task",
                group = %name,
                task = runner.name()
            );
            attempt(&name, &subs, &runner, ctx).instrument(span).await;
        });
    }

    /// Runs `runner` repeatedly, asynchronously, until it fails or `ctx` ends.
    pub fn run_loop<R: Runner>(&self, ctx: &Context, runner: R) {
        let guard = self.wg.add();
        let ctx = ctx.clone();
        let name = Arc::clone(&self.name);
        let subs = self.subs.clone();
        let parent = Span::current();

        tokio::spawn(async move {
            let _guard = guard;
            let mut iteration: u64 = 0;

            while !ctx.is_done() {
                iteration += 1;
                let span = tracing::info_span!(
                    parent: &parent,
                    "task",
                    group = %name,
                    task = runner.name(),
                    iteration
                );
                if attempt(&name, &subs, &runner, ctx.clone()).instrument(span).await {
                    break;
                }
                tokio::task::yield_now().await;
            }
        });
    }

    /// Completes once every `run` / `run_loop` started so far has terminated.
    pub async fn wait(&self) {
        self.wg.wait().await
    }

    /// Number of `run` / `run_loop` invocations still executing.
    pub fn in_flight(&self) -> usize {
        self.wg.count()
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_NAME)
    }
}

/// Executes one invocation and reports its failure.
///
/// Returns `true` when a failure (error or panic) was reported.
pub(crate) async fn attempt<R: Runner>(
    group: &str,
    subs: &SubscriberSet,
    runner: &R,
    ctx: Context,
) -> bool {
    match AssertUnwindSafe(runner.run(ctx)).catch_unwind().await {
        Ok(Ok(())) => false,
        Ok(Err(e)) if e.is_canceled() => false,
        Ok(Err(e)) => {
            subs.emit(
                &Event::new(EventKind::TaskFailed)
                    .with_source(group)
                    .with_task(runner.name())
                    .with_reason(e.to_string()),
            );
            true
        }
        Err(_panic) => {
            subs.emit(
                &Event::new(EventKind::TaskPanicked)
                    .with_source(group)
                    .with_task(runner.name()),
            );
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::{ContextError, Error};
    use crate::runner::RunFn;
    use crate::subscribers::Subscribe;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn kinds(&self) -> Vec<EventKind> {
            self.events.lock().unwrap().iter().map(|e| e.kind).collect()
        }
    }

    impl Subscribe for Recorder {
        fn on_event(&self, event: &Event) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn recorded(name: &str) -> (TaskGroup, Arc<Recorder>) {
        let rec = Arc::new(Recorder::default());
        let group = TaskGroup::with_subscribers(name, SubscriberSet::new(vec![rec.clone()]));
        (group, rec)
    }

    #[tokio::test]
    async fn run_with_error_is_reported_and_waited() {
        let (tg, rec) = recorded("test");
        let counter = Arc::new(AtomicU32::new(0));

        let c = counter.clone();
        tg.run(
            &Context::new(),
            RunFn::new("failing", move |_ctx: Context| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(Error::fail("some error"))
                }
            }),
        );

        tg.wait().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(tg.in_flight(), 0);

        let events = rec.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::TaskFailed);
        assert_eq!(events[0].source.as_deref(), Some("test"));
        assert_eq!(events[0].task.as_deref(), Some("failing"));
        assert!(events[0].reason.as_deref().unwrap().contains("some error"));
    }

    #[tokio::test]
    async fn cancellation_is_not_reported() {
        let (tg, rec) = recorded("test");
        let ctx = Context::new();

        tg.run(
            &ctx,
            RunFn::new("waiter", |ctx: Context| async move {
                ctx.done().await;
                Err(ctx.err().unwrap_or(ContextError::Canceled).into())
            }),
        );

        ctx.cancel();
        tg.wait().await;
        assert!(rec.kinds().is_empty());
    }

    #[tokio::test]
    async fn deadline_exceeded_is_reported() {
        let (tg, rec) = recorded("test");

        tg.run(
            &Context::new(),
            RunFn::new("late", |_ctx: Context| async {
                Err(ContextError::DeadlineExceeded.into())
            }),
        );

        tg.wait().await;
        let events = rec.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::TaskFailed);
        assert_eq!(events[0].reason.as_deref(), Some("context deadline exceeded"));
    }

    #[tokio::test]
    async fn loop_stops_on_deadline_exceeded() {
        let (tg, rec) = recorded("test");
        let counter = Arc::new(AtomicU32::new(0));

        let c = counter.clone();
        tg.run_loop(
            &Context::new(),
            RunFn::new("timed", move |_ctx: Context| {
                let c = c.clone();
                async move {
                    match c.fetch_add(1, Ordering::SeqCst) {
                        0 => Ok(()),
                        _ => Err(ContextError::DeadlineExceeded.into()),
                    }
                }
            }),
        );

        tg.wait().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(rec.kinds(), vec![EventKind::TaskFailed]);
    }

    #[tokio::test]
    async fn deadline_passes_through() {
        let (tg, rec) = recorded("test");
        let ctx = Context::new().with_timeout(Duration::from_secs(1));

        tg.run(
            &ctx,
            RunFn::new("deadline", |ctx: Context| async move {
                match ctx.deadline() {
                    Some(_) => Ok(()),
                    None => Err(Error::fail("no deadline!")),
                }
            }),
        );

        ctx.cancel();
        tg.wait().await;
        assert!(rec.kinds().is_empty());
    }

    #[tokio::test]
    async fn loop_stops_on_error() {
        let (tg, rec) = recorded("test");
        let counter = Arc::new(AtomicU32::new(0));

        let c = counter.clone();
        tg.run_loop(
            &Context::new(),
            RunFn::new("counter", move |_ctx: Context| {
                let c = c.clone();
                async move {
                    if c.load(Ordering::SeqCst) < 3 {
                        c.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    } else {
                        Err(Error::fail("some error"))
                    }
                }
            }),
        );

        tg.wait().await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert_eq!(rec.kinds(), vec![EventKind::TaskFailed]);
    }

    #[tokio::test]
    async fn loop_stops_silently_on_cancel() {
        let (tg, rec) = recorded("test");
        let ctx = Context::new();
        let counter = Arc::new(AtomicU32::new(0));

        let c = counter.clone();
        let cancel = ctx.clone();
        tg.run_loop(
            &ctx,
            RunFn::new("spinner", move |_ctx: Context| {
                let c = c.clone();
                let cancel = cancel.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) + 1 > 3 {
                        cancel.cancel();
                    }
                    Ok(())
                }
            }),
        );

        tg.wait().await;
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert!(rec.kinds().is_empty());
    }

    #[tokio::test]
    async fn loop_keeps_going_after_cancellation_error_on_live_context() {
        let (tg, _rec) = recorded("test");
        let counter = Arc::new(AtomicU32::new(0));

        let c = counter.clone();
        tg.run_loop(
            &Context::new(),
            RunFn::new("flaky", move |_ctx: Context| {
                let c = c.clone();
                async move {
                    match c.fetch_add(1, Ordering::SeqCst) {
                        0 | 1 => Err(ContextError::Canceled.into()),
                        _ => Err(Error::fail("stop")),
                    }
                }
            }),
        );

        tg.wait().await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn panic_is_contained_and_barrier_released() {
        let (tg, rec) = recorded("test");

        struct Explodes;

        #[async_trait::async_trait]
        impl Runner for Explodes {
            async fn run(&self, _ctx: Context) -> Result<(), Error> {
                panic!("boom")
            }

            fn name(&self) -> &str {
                "explodes"
            }
        }

        tg.run(&Context::new(), Explodes);

        tg.wait().await;
        assert_eq!(tg.in_flight(), 0);
        assert_eq!(rec.kinds(), vec![EventKind::TaskPanicked]);
    }

    #[tokio::test]
    async fn barrier_tracks_all_tasks() {
        let (tg, _rec) = recorded("test");
        let ctx = Context::new();

        for _ in 0..8 {
            tg.run(
                &ctx,
                RunFn::new("sleeper", |ctx: Context| async move {
                    let _ = crate::context::sleep(&ctx, Duration::from_millis(20)).await;
                    Ok(())
                }),
            );
        }
        tg.run_loop(
            &ctx,
            RunFn::new("looper", |ctx: Context| async move {
                ctx.done().await;
                Ok(())
            }),
        );

        assert_eq!(tg.in_flight(), 9);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(tg.in_flight(), 1);

        ctx.cancel();
        tg.wait().await;
        assert_eq!(tg.in_flight(), 0);
    }

    #[test]
    fn default_group_name() {
        assert_eq!(TaskGroup::default().name(), DEFAULT_GROUP_NAME);
    }
}
