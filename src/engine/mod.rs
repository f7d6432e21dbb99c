//! # Engine: the explicitly constructed entry point.
//!
//! The [`Engine`] owns a root [`Context`], a [`TaskGroup`] named after the
//! configuration and the [`SubscriberSet`] every component reports to. It is
//! built once and passed to whoever needs to start work; there is no
//! process-wide default instance.
//!
//! ```text
//! Engine
//!   ├─ root: Context ─────────┬─► run / run_loop   (TaskGroup, fire-and-forget)
//!   │                         ├─► pool()           (WorkerPool [+ WithTimeout])
//!   │                         └─► serve(acts)      (RunGroup [+ Shutdown])
//!   ├─ tasks: TaskGroup ──────► wait()
//!   └─ subs: SubscriberSet ───► LogWriter / custom subscribers
//! ```
//!
//! ## Example
//! ```no_run
//! use actvisor::{Activity, Config, Context, Engine, Error, RunFn};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let engine = Engine::new(Config::default());
//!
//!     engine.run(RunFn::new("warmup", |_ctx: Context| async { Ok(()) }));
//!
//!     let api = Activity::new(RunFn::new("api", |ctx: Context| async move {
//!         ctx.done().await;
//!         Ok(())
//!     }));
//!     let res = engine.serve(vec![api]).await;
//!
//!     engine.shutdown();
//!     engine.wait().await;
//!     res
//! }
//! ```

mod builder;

use std::sync::Arc;

use crate::config::Config;
use crate::context::Context;
use crate::error::Error;
use crate::group::{RunGroup, TaskGroup};
use crate::pool::{Scheduler, WithTimeout, WorkerPool};
use crate::runner::{Activity, Runner};
use crate::shutdown::Shutdown;
use crate::subscribers::SubscriberSet;

pub use builder::EngineBuilder;

/// Owns the root context, the task group and the reporting pipeline.
#[derive(Debug)]
pub struct Engine {
    cfg: Config,
    root: Context,
    tasks: TaskGroup,
    subs: SubscriberSet,
}

impl Engine {
    /// Creates an engine reporting through [`LogWriter`](crate::LogWriter).
    pub fn new(cfg: Config) -> Self {
        Self::builder(cfg).build()
    }

    /// Returns a builder for custom subscribers or a parent context.
    pub fn builder(cfg: Config) -> EngineBuilder {
        EngineBuilder::new(cfg)
    }

    /// The configuration the engine was built from.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Root context; cancelled by [`shutdown`](Self::shutdown).
    pub fn context(&self) -> &Context {
        &self.root
    }

    /// The engine's task group.
    pub fn tasks(&self) -> &TaskGroup {
        &self.tasks
    }

    /// Subscribers every component built by the engine reports to.
    pub fn subscribers(&self) -> &SubscriberSet {
        &self.subs
    }

    /// Runs `runner` once in the background under the root context.
    pub fn run<R: Runner>(&self, runner: R) {
        self.tasks.run(&self.root, runner);
    }

    /// Runs `runner` repeatedly in the background until it fails or the engine shuts down.
    pub fn run_loop<R: Runner>(&self, runner: R) {
        self.tasks.run_loop(&self.root, runner);
    }

    /// Completes once every task started through [`run`](Self::run) /
    /// [`run_loop`](Self::run_loop) has terminated.
    pub async fn wait(&self) {
        self.tasks.wait().await
    }

    /// Builds a worker pool bound to the root context.
    ///
    /// Sized by [`Config::pool_capacity`]; wrapped in [`WithTimeout`] when
    /// [`Config::default_timeout`] is set.
    pub fn pool(&self) -> Arc<dyn Scheduler> {
        let pool = WorkerPool::new(&self.root, self.cfg.pool_capacity())
            .with_name(self.cfg.name.as_str())
            .with_subscribers(self.subs.clone());

        match self.cfg.default_timeout() {
            Some(timeout) => Arc::new(WithTimeout::new(timeout, pool)),
            None => Arc::new(pool),
        }
    }

    /// Runs `activities` as one [`RunGroup`] under the root context.
    ///
    /// With `handle_signals` set, a [`Shutdown`] listener joins the group, so a
    /// termination signal stops every activity and is returned as the error.
    /// Returns the first error any member returned.
    pub async fn serve(&self, activities: Vec<Activity>) -> Result<(), Error> {
        let mut members = activities;
        if self.cfg.handle_signals {
            let shutdown = Shutdown::new().with_subscribers(self.subs.clone());
            members.push(Activity::closeable(Arc::new(shutdown)));
        }

        RunGroup::new(members)
            .with_name(self.cfg.name.as_str())
            .with_subscribers(self.subs.clone())
            .run(self.root.clone())
            .await
    }

    /// Cancels the root context: loops stop, pools close, `serve` returns.
    pub fn shutdown(&self) {
        self.root.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::error::ContextError;
    use crate::events::{Event, EventKind};
    use crate::runner::RunFn;
    use crate::subscribers::Subscribe;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Event>>);

    impl Subscribe for Recorder {
        fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    fn quiet_config() -> Config {
        Config {
            name: "engine-test".to_string(),
            handle_signals: false,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn run_reports_with_engine_name() {
        let rec = Arc::new(Recorder::default());
        let engine = Engine::builder(quiet_config())
            .with_subscribers(vec![rec.clone()])
            .build();

        engine.run(RunFn::new("oops", |_ctx: Context| async { Err(Error::fail("bad")) }));
        engine.wait().await;

        let events = rec.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::TaskFailed);
        assert_eq!(events[0].source.as_deref(), Some("engine-test"));
    }

    #[tokio::test]
    async fn shutdown_stops_loops() {
        let engine = Engine::builder(quiet_config()).with_subscribers(Vec::new()).build();
        let spins = Arc::new(AtomicU32::new(0));

        let s = spins.clone();
        engine.run_loop(RunFn::new("spin", move |ctx: Context| {
            let s = s.clone();
            async move {
                s.fetch_add(1, Ordering::SeqCst);
                let _ = crate::context::sleep(&ctx, Duration::from_millis(5)).await;
                Ok(())
            }
        }));

        tokio::time::sleep(Duration::from_millis(20)).await;
        engine.shutdown();
        engine.wait().await;
        assert!(spins.load(Ordering::SeqCst) >= 1);
        assert_eq!(engine.tasks().in_flight(), 0);
    }

    #[tokio::test]
    async fn pool_applies_configured_timeout() {
        let mut cfg = quiet_config();
        cfg.pool_size = 1;
        cfg.task_timeout = Duration::from_millis(5);
        let engine = Engine::builder(cfg).with_subscribers(Vec::new()).build();

        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        engine
            .pool()
            .schedule(
                engine.context(),
                RunFn::arc("bounded", move |ctx: Context| {
                    let s = s.clone();
                    async move {
                        ctx.done().await;
                        *s.lock().unwrap() = ctx.err();
                        Ok(())
                    }
                }),
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(*seen.lock().unwrap(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn serve_returns_first_failure() {
        let engine = Engine::builder(quiet_config()).with_subscribers(Vec::new()).build();
        let res = engine
            .serve(vec![
                Activity::new(RunFn::new("fails", |_ctx: Context| async {
                    Err(Error::fail("oh no"))
                })),
                Activity::new(RunFn::new("waits", |ctx: Context| async move {
                    ctx.done().await;
                    Ok(())
                })),
            ])
            .await;

        assert!(res.unwrap_err().to_string().contains("oh no"));
        assert!(!engine.context().is_done());
    }

    #[tokio::test]
    async fn child_engine_follows_parent() {
        let parent = Context::new();
        let engine = Engine::builder(quiet_config()).with_context(&parent).build();
        parent.cancel();
        assert!(engine.context().is_done());
    }
}
