//! # Events emitted by task groups, pools and periodic jobs.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Failure events**: errors that fire-and-forget paths would otherwise swallow
//! - **Tick events**: periodic job lifecycle
//! - **Shutdown events**: termination requests
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task
//! name, the reporting component and error text.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use actvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_source("workers")
//!     .with_task("demo-task")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("demo-task"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Failure events ===
    /// A fire-and-forget task returned a non-cancellation error.
    ///
    /// Sets:
    /// - `source`: task group / pool name
    /// - `task`: runner name
    /// - `reason`: error message
    TaskFailed,

    /// A task panicked; the panic was contained.
    ///
    /// Sets:
    /// - `source`: task group name
    /// - `task`: runner name
    TaskPanicked,

    /// Closing an activity failed. Close errors never replace an earlier error.
    ///
    /// Sets:
    /// - `source`: run group / cron job name
    /// - `task`: activity name
    /// - `reason`: error message
    CloseFailed,

    /// A periodic job returned an error on one of its ticks.
    ///
    /// Sets:
    /// - `source`: schedule expression
    /// - `task`: job name
    /// - `tick`: tick number (1-based)
    /// - `reason`: error message
    JobFailed,

    /// A pool submission was not admitted because its context ended first.
    ///
    /// Sets:
    /// - `source`: pool name
    /// - `task`: runner name
    /// - `reason`: context error
    TaskRejected,

    // === Tick events ===
    /// A periodic job tick is starting.
    ///
    /// Sets:
    /// - `source`: schedule expression
    /// - `task`: job name
    /// - `tick`: tick number (1-based)
    TickStarting,

    /// A periodic job tick finished (successfully or not).
    ///
    /// Sets:
    /// - `source`: schedule expression
    /// - `task`: job name
    /// - `tick`: tick number (1-based)
    TickFinished,

    // === Shutdown events ===
    /// A termination signal was received.
    ///
    /// Sets:
    /// - `reason`: signal name
    ShutdownSignal,
}

/// Engine event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Reporting component (group name, pool name, schedule expression).
    pub source: Option<Arc<str>>,
    /// Name of the task, if applicable.
    pub task: Option<Arc<str>>,
    /// Human-readable reason (errors, signal names).
    pub reason: Option<Arc<str>>,
    /// Tick number for periodic jobs (starting from 1).
    pub tick: Option<u64>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            source: None,
            task: None,
            reason: None,
            tick: None,
        }
    }

    /// Attaches the reporting component.
    #[inline]
    pub fn with_source(mut self, source: impl Into<Arc<str>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a tick number.
    #[inline]
    pub fn with_tick(mut self, tick: u64) -> Self {
        self.tick = Some(tick);
        self
    }

    /// Returns `true` for the failure category.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::TaskFailed
                | EventKind::TaskPanicked
                | EventKind::CloseFailed
                | EventKind::JobFailed
        )
    }
}
