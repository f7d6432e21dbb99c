//! # LogWriter: default event subscriber
//!
//! Writes incoming [`Event`]s through `tracing`. Failures are logged at
//! `error`, shutdown signals at `warn`, and tick lifecycle and rejected
//! submissions at `debug`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! ERROR actvisor: task failed source="async.run" task="poller" error="execution failed: boom"
//! ERROR actvisor: close failed source="run-group" task="cache" error="execution failed: io"
//! DEBUG actvisor: tick starting source="@every 1s" task="report" tick=3
//! WARN  actvisor: shutdown signal received signal="hangup"
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber backed by `tracing`.
#[derive(Default, Debug)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Subscribe for LogWriter {
    fn on_event(&self, e: &Event) {
        let source = e.source.as_deref().unwrap_or("-");
        let task = e.task.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::TaskFailed => {
                tracing::error!(target: "actvisor", source, task, error = reason, "task failed");
            }
            EventKind::TaskPanicked => {
                tracing::error!(target: "actvisor", source, task, "task panicked");
            }
            EventKind::CloseFailed => {
                tracing::error!(target: "actvisor", source, task, error = reason, "close failed");
            }
            EventKind::JobFailed => {
                tracing::error!(
                    target: "actvisor",
                    source,
                    task,
                    tick = e.tick,
                    error = reason,
                    "job failed"
                );
            }
            EventKind::TaskRejected => {
                tracing::debug!(
                    target: "actvisor",
                    source,
                    task,
                    error = reason,
                    "task not admitted"
                );
            }
            EventKind::TickStarting => {
                tracing::debug!(target: "actvisor", source, task, tick = e.tick, "tick starting");
            }
            EventKind::TickFinished => {
                tracing::debug!(target: "actvisor", source, task, tick = e.tick, "tick finished");
            }
            EventKind::ShutdownSignal => {
                tracing::warn!(target: "actvisor", signal = reason, "shutdown signal received");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
