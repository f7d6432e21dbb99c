//! Synchronization primitives shared by the engine and exported for activities.
//!
//! - [`WaitGroup`]: counting barrier with drop-based release;
//! - [`CancelableMutex`]: mutual exclusion whose acquisition can be aborted.

mod mutex;
mod wait_group;

pub use mutex::{CancelableMutex, CancelableMutexGuard};
pub use wait_group::{WaitGroup, WaitGuard};
