//! # Counting wait barrier.
//!
//! [`WaitGroup::add`] increments the count and hands back a [`WaitGuard`];
//! dropping the guard decrements it. Because release happens in `Drop`, the
//! count stays balanced even when the tracked task panics and unwinds.
//!
//! ```text
//! add() ─► count += 1 ─► WaitGuard ── drop ──► count -= 1 ─► wake wait() at 0
//! ```

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable counting barrier; clones share the same count.
#[derive(Clone, Debug)]
pub struct WaitGroup {
    count: Arc<watch::Sender<usize>>,
}

/// Releases one unit of a [`WaitGroup`] on drop.
#[must_use = "dropping the guard immediately releases the barrier"]
#[derive(Debug)]
pub struct WaitGuard {
    count: Arc<watch::Sender<usize>>,
}

impl WaitGroup {
    /// Creates an empty barrier.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0usize);
        Self {
            count: Arc::new(tx),
        }
    }

    /// Registers one unit of in-flight work.
    pub fn add(&self) -> WaitGuard {
        self.count.send_modify(|c| *c += 1);
        WaitGuard {
            count: Arc::clone(&self.count),
        }
    }

    /// Current number of outstanding guards.
    pub fn count(&self) -> usize {
        *self.count.borrow()
    }

    /// Completes once the count is zero.
    pub async fn wait(&self) {
        let mut rx = self.count.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|c| *c == 0).await;
    }
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        self.count.send_modify(|c| {
            debug_assert!(*c > 0, "wait group released more than acquired");
            *c = c.saturating_sub(1);
        });
    }
}
