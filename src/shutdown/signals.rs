//! OS signal listening for [`Shutdown`](super::Shutdown).
//!
//! **Unix:** `SIGINT`, `SIGTERM` and `SIGHUP`. Once one of them arrived, all
//! three are reset to their default disposition, so a second signal during a
//! hung graceful shutdown terminates the process.
//!
//! **Other platforms:** Ctrl-C via [`tokio::signal::ctrl_c`].

use super::Signal;

/// Registered listeners; created before waiting so no signal is missed.
#[cfg(unix)]
pub(super) struct Listener {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
    sighup: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Listener {
    pub(super) fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
            sighup: signal(SignalKind::hangup())?,
        })
    }

    /// Completes with the first signal delivered.
    pub(super) async fn recv(&mut self) -> Signal {
        tokio::select! {
            _ = self.sigint.recv() => Signal::Interrupt,
            _ = self.sigterm.recv() => Signal::Terminate,
            _ = self.sighup.recv() => Signal::Hangup,
        }
    }
}

/// Restores the default OS disposition of every listened-to signal.
#[cfg(unix)]
pub(super) fn reset() {
    for sig in Signal::ALL {
        // SAFETY: installing SIG_DFL for a valid signal number has no memory effects.
        unsafe {
            libc::signal(sig.raw(), libc::SIG_DFL);
        }
    }
}

#[cfg(not(unix))]
pub(super) struct Listener;

#[cfg(not(unix))]
impl Listener {
    pub(super) fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub(super) async fn recv(&mut self) -> Signal {
        match tokio::signal::ctrl_c().await {
            Ok(()) => Signal::Interrupt,
            // Listening is impossible; never complete.
            Err(_) => std::future::pending().await,
        }
    }
}

#[cfg(not(unix))]
pub(super) fn reset() {}
