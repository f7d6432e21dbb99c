//! # Graceful shutdown activity.
//!
//! [`Shutdown`] is a [`Runner`] that blocks until the process is asked to
//! stop. Put it in a [`RunGroup`](crate::RunGroup) next to the service
//! activities: when it returns, the group cancels everyone else.
//!
//! ```text
//!                 ┌── SIGINT/SIGTERM/SIGHUP ─► reset dispositions ─► Err(Signal)
//! Shutdown::run ──┼── ctx ended ─────────────────────────────────► Err(Context)
//!                 └── close() ───────────────────────────────────► Ok(())
//! ```
//!
//! `close` is idempotent, and every `run` after it returns `Ok(())` at once.

mod signals;

use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::context::Context;
use crate::error::{ContextError, Error, SignalError};
use crate::events::{Event, EventKind};
use crate::runner::{Closer, Runner};
use crate::subscribers::SubscriberSet;

/// Termination signals observed by [`Shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGINT` (Ctrl-C).
    Interrupt,
    /// `SIGTERM`.
    Terminate,
    /// `SIGHUP`.
    Hangup,
}

impl Signal {
    /// Every signal the listener registers for.
    pub const ALL: [Signal; 3] = [Signal::Interrupt, Signal::Terminate, Signal::Hangup];

    /// Raw signal number.
    #[cfg(unix)]
    pub fn raw(self) -> libc::c_int {
        match self {
            Signal::Interrupt => libc::SIGINT,
            Signal::Terminate => libc::SIGTERM,
            Signal::Hangup => libc::SIGHUP,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Signal::Interrupt => "interrupt",
            Signal::Terminate => "terminated",
            Signal::Hangup => "hangup",
        })
    }
}

/// Blocks until a termination signal, context end or explicit close.
#[derive(Debug)]
pub struct Shutdown {
    closed: CancellationToken,
    subs: SubscriberSet,
}

impl Shutdown {
    /// Creates a shutdown listener reporting to the default [`LogWriter`](crate::LogWriter).
    pub fn new() -> Self {
        Self {
            closed: CancellationToken::new(),
            subs: SubscriberSet::default(),
        }
    }

    /// Replaces the subscribers the received signal is reported to.
    pub fn with_subscribers(mut self, subs: SubscriberSet) -> Self {
        self.subs = subs;
        self
    }

    /// Returns `true` once [`close`](Closer::close) was called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Runner for Shutdown {
    async fn run(&self, ctx: Context) -> Result<(), Error> {
        if self.closed.is_cancelled() {
            return Ok(());
        }
        let mut listener = signals::Listener::register()?;

        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Ok(()),
            _ = ctx.done() => Err(ctx.err().unwrap_or(ContextError::Canceled).into()),
            signal = listener.recv() => {
                signals::reset();
                self.subs.emit(
                    &Event::new(EventKind::ShutdownSignal).with_reason(signal.to_string()),
                );
                Err(SignalError { signal }.into())
            }
        }
    }

    fn name(&self) -> &str {
        "shutdown"
    }
}

#[async_trait]
impl Closer for Shutdown {
    async fn close(&self, _ctx: Context) -> Result<(), Error> {
        self.closed.cancel();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn context_cancel_ends_run() {
        let shutdown = Arc::new(Shutdown::new());
        let ctx = Context::new();

        let s = shutdown.clone();
        let c = ctx.clone();
        let handle = tokio::spawn(async move { s.run(c).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        ctx.cancel();

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "context canceled");
    }

    #[tokio::test]
    async fn close_ends_run_without_error() {
        let shutdown = Arc::new(Shutdown::new());

        let s = shutdown.clone();
        let handle = tokio::spawn(async move { s.run(Context::new()).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.close(Context::new()).await.unwrap();

        assert!(handle.await.unwrap().is_ok());
        assert!(shutdown.is_closed());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_sticky() {
        let shutdown = Shutdown::new();
        shutdown.close(Context::new()).await.unwrap();
        shutdown.close(Context::new()).await.unwrap();

        assert!(shutdown.run(Context::new()).await.is_ok());
    }

    #[test]
    fn signal_names() {
        assert_eq!(Signal::Interrupt.to_string(), "interrupt");
        assert_eq!(Signal::Terminate.to_string(), "terminated");
        assert_eq!(Signal::Hangup.to_string(), "hangup");
    }
}
