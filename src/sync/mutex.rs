//! # Mutex with cancellable acquisition.
//!
//! [`CancelableMutex`] is a binary semaphore: [`lock`](CancelableMutex::lock)
//! waits for the single permit, the context ending, or its deadline, whichever
//! comes first. Unlike `std::sync::Mutex::lock`, acquisition **can fail** and
//! the caller must not proceed as if holding the lock when it does.
//!
//! ## Rules
//! - At most one holder at any time.
//! - An already-ended context fails even if the permit is free.
//! - [`unlock`](CancelableMutex::unlock) without a matching successful `lock`
//!   is a programming error and panics.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Semaphore;

use crate::context::Context;
use crate::error::ContextError;

/// Mutual exclusion lock whose acquisition can be cancelled.
#[derive(Debug)]
pub struct CancelableMutex {
    sem: Semaphore,
    held: AtomicBool,
}

impl CancelableMutex {
    /// Creates an unlocked mutex.
    pub fn new() -> Self {
        Self {
            sem: Semaphore::new(1),
            held: AtomicBool::new(false),
        }
    }

    /// Acquires the mutex, waiting until it is free or `ctx` ends.
    ///
    /// Returns the context error if the lock was not acquired.
    pub async fn lock(&self, ctx: &Context) -> Result<(), ContextError> {
        tokio::select! {
            biased;
            _ = ctx.done() => Err(ctx.err().unwrap_or(ContextError::Canceled)),
            permit = self.sem.acquire() => {
                // The semaphore is never closed.
                let Ok(permit) = permit else {
                    return Err(ContextError::Canceled);
                };
                permit.forget();
                self.mark_held();
                Ok(())
            }
        }
    }

    /// Acquires the mutex only if it is free right now.
    pub fn try_lock(&self) -> bool {
        match self.sem.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.mark_held();
                true
            }
            Err(_) => false,
        }
    }

    /// Acquires the mutex and returns a guard that unlocks it on drop.
    pub async fn lock_guard(
        &self,
        ctx: &Context,
    ) -> Result<CancelableMutexGuard<'_>, ContextError> {
        self.lock(ctx).await?;
        Ok(CancelableMutexGuard { mutex: self })
    }

    /// Releases the mutex, letting the next waiter proceed.
    ///
    /// # Panics
    /// If the mutex is not locked.
    pub fn unlock(&self) {
        if !self.held.swap(false, Ordering::AcqRel) {
            panic!("actvisor: unlock of unlocked CancelableMutex");
        }
        self.sem.add_permits(1);
    }

    /// Returns `true` while some caller holds the mutex.
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    fn mark_held(&self) {
        let was_held = self.held.swap(true, Ordering::AcqRel);
        debug_assert!(!was_held, "two holders of a CancelableMutex");
    }
}

impl Default for CancelableMutex {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard returned by [`CancelableMutex::lock_guard`].
#[must_use = "the mutex is unlocked as soon as the guard is dropped"]
#[derive(Debug)]
pub struct CancelableMutexGuard<'a> {
    mutex: &'a CancelableMutex,
}

impl Drop for CancelableMutexGuard<'_> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}
