//! # actvisor
//!
//! **Actvisor** is an asynchronous execution engine for long-lived service
//! activities.
//!
//! It starts background work, bounds its concurrency, times it out,
//! aggregates its failures and shuts it down cleanly on signal or
//! cancellation. Everything is driven by a cooperative [`Context`]: nothing
//! in the crate aborts a running activity.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!  │   Activity   │   │   Activity   │   │   CronJob    │
//!  │ (Runner [+   │   │ (Runner [+   │   │ (schedule +  │
//!  │   Closer])   │   │   Closer])   │   │  job factory)│
//!  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!         ▼                  ▼                  ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  RunGroup (fail fast, always close)  + Shutdown (signals)│
//! └──────────────────────────┬───────────────────────────────┘
//!                            │ Engine::serve / Runner::run
//!                            ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  Engine                                                  │
//! │  - root Context        (cancellation + deadlines)        │
//! │  - TaskGroup           (run / run_loop / wait)           │
//! │  - pool()              (WorkerPool [+ WithTimeout])      │
//! │  - SubscriberSet       (LogWriter / custom)              │
//! └──────────────────────────┬───────────────────────────────┘
//!                            │ swallowed failures, ticks, signals
//!                            ▼
//!                   SubscriberSet::emit(&Event)
//!                   ┌────────┼────────┐
//!                   ▼        ▼        ▼
//!               LogWriter   sub2    subN
//! ```
//!
//! ### Cancellation
//! ```text
//! Engine root ──► RunGroup child ──► member contexts
//!             └─► pool child ──────► admitted task contexts [+ deadline]
//!
//! first failure in a RunGroup ──► cancel group child ──► siblings stop ──► closers run
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                       |
//! |-------------------|----------------------------------------------------------|------------------------------------------|
//! | **Activities**    | Units of work and their cleanup.                         | [`Runner`], [`Closer`], [`Activity`], [`RunFn`] |
//! | **Groups**        | Fire-and-forget tracking and fail-fast composition.      | [`TaskGroup`], [`RunGroup`]              |
//! | **Pools**         | Bounded concurrency, per-task deadlines, completion.     | [`WorkerPool`], [`WithTimeout`], [`with_wait`] |
//! | **Scheduling**    | Periodic, non-overlapping jobs.                          | [`CronJob`], [`Schedule`], [`TickDispatcher`] |
//! | **Shutdown**      | Signal-driven termination.                               | [`Shutdown`], [`Signal`]                 |
//! | **Sync**          | Cancelable mutual exclusion, wait barriers.              | [`CancelableMutex`], [`WaitGroup`]       |
//! | **Subscriber API**| Observe failures the engine would otherwise swallow.     | [`Subscribe`], [`Event`], [`LogWriter`]  |
//! | **Errors**        | Typed errors with stable labels.                         | [`Error`], [`ContextError`]              |
//! | **Configuration** | Engine settings.                                         | [`Config`]                               |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use actvisor::{Activity, Config, Context, CronJob, Engine, Error, RunFn};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Error> {
//!     let mut cfg = Config::default();
//!     cfg.handle_signals = false;
//!     let engine = Engine::new(cfg);
//!
//!     let report = Arc::new(CronJob::new(
//!         || Activity::new(RunFn::new("report", |_ctx: Context| async { Ok(()) })),
//!         "@every 10ms",
//!     ));
//!
//!     let stop = engine.context().clone();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(Duration::from_millis(50)).await;
//!         stop.cancel();
//!     });
//!
//!     let res = engine.serve(vec![Activity::closeable(report)]).await;
//!     assert!(res.unwrap_err().is_cancellation());
//!     Ok(())
//! }
//! ```
mod config;
mod context;
mod cronjob;
mod engine;
mod error;
mod events;
mod group;
mod pool;
mod runner;
mod shutdown;
mod subscribers;
mod sync;

// ---- Public re-exports ----

pub use config::Config;
pub use context::{Context, sleep, sleep_until};
pub use cronjob::{CronJob, Drain, Schedule, TickDispatcher};
pub use engine::{Engine, EngineBuilder};
pub use error::{ContextError, Error, SignalError};
pub use events::{Event, EventKind};
pub use group::{DEFAULT_GROUP_NAME, RunGroup, TaskGroup};
pub use pool::{Scheduler, Size, Waiter, WithTimeout, WithWait, WorkerPool, with_wait};
pub use runner::{Activity, Closer, RunFn, Runner};
pub use shutdown::{Shutdown, Signal};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use sync::{CancelableMutex, CancelableMutexGuard, WaitGroup, WaitGuard};
