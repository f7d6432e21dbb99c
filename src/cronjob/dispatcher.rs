//! # TickDispatcher: serialized execution of scheduled jobs.
//!
//! ```text
//! add_job(expr, job) ─┐
//!                     ▼
//! start(ctx) ─► loop {
//!                 sleep until earliest entry.next   (or stop / ctx end / new entry)
//!                 span "tick" ─► job.run(ctx)       (one at a time)
//!                 entry.next = next slot after the scheduled one, skipping missed slots
//!               }
//! stop() ─► Drain ─► completes once the in-flight tick returned
//! ```
//!
//! ## Rules
//! - Ticks never overlap: a job that overruns delays everything behind it.
//! - `stop` does not cancel the in-flight job; jobs observe the `ctx` given to `start`.
//! - `start` twice is a no-op; `stop` before `start` yields a completed [`Drain`].

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::context::Context;
use crate::error::Error;
use crate::events::{Event, EventKind};
use crate::runner::Runner;
use crate::subscribers::SubscriberSet;

use super::Schedule;

struct Entry {
    schedule: Schedule,
    job: Arc<dyn Runner>,
}

struct Slot {
    entry: Entry,
    next: Instant,
    ticks: u64,
}

/// Drives scheduled jobs from a single loop.
pub struct TickDispatcher {
    tx: mpsc::UnboundedSender<Entry>,
    rx: Option<mpsc::UnboundedReceiver<Entry>>,
    stop: CancellationToken,
    handle: Option<JoinHandle<()>>,
    subs: SubscriberSet,
}

impl TickDispatcher {
    /// Creates an idle dispatcher reporting to the default [`LogWriter`](crate::LogWriter).
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Some(rx),
            stop: CancellationToken::new(),
            handle: None,
            subs: SubscriberSet::default(),
        }
    }

    /// Replaces the subscribers tick events are reported to.
    pub fn with_subscribers(mut self, subs: SubscriberSet) -> Self {
        self.subs = subs;
        self
    }

    /// Registers `job` under the schedule `expr`.
    ///
    /// Jobs may be added before or after [`start`](Self::start); the first
    /// fire time is computed from the moment the loop picks the entry up.
    pub fn add_job(&self, expr: &str, job: Arc<dyn Runner>) -> Result<(), Error> {
        self.add(Schedule::parse(expr)?, job);
        Ok(())
    }

    /// Registers `job` under an already parsed schedule.
    pub fn add(&self, schedule: Schedule, job: Arc<dyn Runner>) {
        // The receiver lives as long as the loop; after stop the entry is dropped.
        let _ = self.tx.send(Entry { schedule, job });
    }

    /// Starts the loop; jobs run with `ctx` and the loop exits when it ends.
    pub fn start(&mut self, ctx: &Context) {
        let Some(rx) = self.rx.take() else {
            return;
        };
        let ctx = ctx.clone();
        let stop = self.stop.clone();
        let subs = self.subs.clone();

        self.handle = Some(tokio::spawn(dispatch(ctx, stop, rx, subs)));
    }

    /// Returns `true` while the loop is running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops scheduling new ticks.
    ///
    /// The returned [`Drain`] completes once the in-flight tick, if any, returned.
    pub fn stop(&mut self) -> Drain {
        self.stop.cancel();
        Drain {
            handle: self.handle.take(),
        }
    }
}

impl Drop for TickDispatcher {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

impl Default for TickDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TickDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickDispatcher")
            .field("running", &self.is_running())
            .field("stopped", &self.stop.is_cancelled())
            .finish()
    }
}

/// Completion of a stopped [`TickDispatcher`].
#[derive(Debug)]
#[must_use = "await the drain to wait for the in-flight tick"]
pub struct Drain {
    handle: Option<JoinHandle<()>>,
}

impl Future for Drain {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<()> {
        match self.handle.as_mut() {
            None => Poll::Ready(()),
            Some(handle) => Pin::new(handle).poll(cx).map(|_| ()),
        }
    }
}

async fn dispatch(
    ctx: Context,
    stop: CancellationToken,
    mut incoming: mpsc::UnboundedReceiver<Entry>,
    subs: SubscriberSet,
) {
    let mut slots: Vec<Slot> = Vec::new();
    let mut open = true;

    loop {
        let earliest = slots
            .iter()
            .enumerate()
            .min_by_key(|(_, slot)| slot.next)
            .map(|(idx, slot)| (idx, slot.next));

        let due = tokio::select! {
            biased;
            _ = stop.cancelled() => return,
            _ = ctx.done() => return,
            entry = incoming.recv(), if open => {
                match entry {
                    Some(entry) => {
                        if let Some(next) = entry.schedule.next_after(Instant::now()) {
                            slots.push(Slot { entry, next, ticks: 0 });
                        }
                    }
                    None => open = false,
                }
                continue;
            }
            idx = wait_for(earliest) => idx,
        };

        let slot = &mut slots[due];
        slot.ticks += 1;
        let tick = slot.ticks;
        let expr = slot.entry.schedule.expr().to_string();
        let job = Arc::clone(&slot.entry.job);

        subs.emit(
            &Event::new(EventKind::TickStarting)
                .with_source(expr.as_str())
                .with_task(job.name())
                .with_tick(tick),
        );

        let span = tracing::info_span!("tick", schedule = %expr, task = job.name(), tick);
        let res = AssertUnwindSafe(job.run(ctx.clone()))
            .catch_unwind()
            .instrument(span)
            .await
            .unwrap_or_else(|_| {
                Err(Error::Panicked {
                    task: job.name().to_string(),
                })
            });

        if let Err(err) = &res {
            subs.emit(
                &Event::new(EventKind::JobFailed)
                    .with_source(expr.as_str())
                    .with_task(job.name())
                    .with_tick(tick)
                    .with_reason(err.to_string()),
            );
        }
        subs.emit(
            &Event::new(EventKind::TickFinished)
                .with_source(expr.as_str())
                .with_task(job.name())
                .with_tick(tick),
        );

        let slot = &mut slots[due];
        match slot.entry.schedule.next_from(slot.next, Instant::now()) {
            Some(next) => slot.next = next,
            None => {
                slots.swap_remove(due);
            }
        }
    }
}

/// Sleeps until the earliest slot is due and returns its index; pends forever when idle.
async fn wait_for(earliest: Option<(usize, Instant)>) -> usize {
    match earliest {
        Some((idx, at)) => {
            tokio::time::sleep_until(at).await;
            idx
        }
        None => std::future::pending().await,
    }
}
