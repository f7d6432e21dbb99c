//! Error types used by the actvisor engine and by activities.
//!
//! This module defines:
//!
//! - [`ContextError`]: why a [`Context`](crate::Context) ended.
//! - [`SignalError`]: which OS signal requested the shutdown.
//! - [`Error`]: everything a [`Runner`](crate::Runner) or the engine can return.
//!
//! [`Error`] provides helper methods (`as_label`, `is_cancellation`) for logging
//! and for the "cancellation is not a failure" policy applied on fire-and-forget paths.

use std::sync::Arc;

use thiserror::Error;

use crate::shutdown::Signal;

/// # Reason a context ended.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextError {
    /// The context (or one of its parents) was cancelled explicitly.
    #[error("context canceled")]
    Canceled,

    /// The context deadline elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// # Termination signal received by [`Shutdown`](crate::Shutdown).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("signal {signal}")]
pub struct SignalError {
    /// The signal that was delivered.
    pub signal: Signal,
}

/// # Errors produced by activities and by the engine.
///
/// Explicit cancellation ([`ContextError::Canceled`]) is never treated as a
/// real failure on fire-and-forget paths; an elapsed deadline is. Both are
/// still returned by blocking calls such as
/// [`Shutdown::run`](crate::Shutdown) or [`CronJob::run`](crate::CronJob).
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The context ended (cancelled or deadline exceeded).
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A termination signal was received.
    #[error(transparent)]
    Signal(#[from] SignalError),

    /// Signal handlers could not be installed.
    #[error("failed to listen for signals: {0}")]
    SignalSetup(#[source] Arc<std::io::Error>),

    /// Activity execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// A periodic job failed during one of its ticks.
    #[error("job failed: {source}")]
    Job {
        /// Error returned by the job.
        source: Box<Error>,
    },

    /// Releasing an activity's resources failed.
    #[error("close failed: {source}")]
    Close {
        /// Error returned by the closer.
        source: Box<Error>,
    },

    /// An activity panicked while running.
    #[error("{task} panicked")]
    Panicked {
        /// Name of the activity.
        task: String,
    },

    /// A schedule expression could not be parsed.
    #[error("invalid schedule {expr:?}: {reason}")]
    InvalidSchedule {
        /// The rejected expression.
        expr: String,
        /// Parser diagnostics.
        reason: String,
    },
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::SignalSetup(Arc::new(err))
    }
}

impl Error {
    /// Shorthand for [`Error::Fail`].
    ///
    /// # Example
    /// ```
    /// use actvisor::Error;
    ///
    /// let err = Error::fail("oh no");
    /// assert_eq!(err.to_string(), "execution failed: oh no");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        Error::Fail {
            error: error.into(),
        }
    }

    /// Returns `true` when the error only reports that a context ended.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Context(_))
    }

    /// Returns `true` for an explicit cancellation, not an elapsed deadline.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Context(ContextError::Canceled))
    }

    /// Returns the context error, if this is one.
    pub fn as_context(&self) -> Option<ContextError> {
        match self {
            Error::Context(e) => Some(*e),
            _ => None,
        }
    }

    /// Returns the delivered signal, if this error reports one.
    pub fn signal(&self) -> Option<Signal> {
        match self {
            Error::Signal(e) => Some(e.signal),
            _ => None,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use actvisor::{ContextError, Error};
    ///
    /// assert_eq!(Error::from(ContextError::Canceled).as_label(), "context_canceled");
    /// assert_eq!(Error::fail("boom").as_label(), "activity_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            Error::Context(ContextError::Canceled) => "context_canceled",
            Error::Context(ContextError::DeadlineExceeded) => "context_deadline_exceeded",
            Error::Signal(_) => "shutdown_signal",
            Error::SignalSetup(_) => "signal_setup_failed",
            Error::Fail { .. } => "activity_failed",
            Error::Job { .. } => "job_failed",
            Error::Close { .. } => "close_failed",
            Error::Panicked { .. } => "activity_panicked",
            Error::InvalidSchedule { .. } => "invalid_schedule",
        }
    }
}
