//! Composition of activities.
//!
//! - [`TaskGroup`]: fire-and-forget `run` / `run_loop` with a wait barrier;
//! - [`RunGroup`]: run a fixed set of activities, fail fast, always close.

mod run_group;
mod task_group;

pub use run_group::RunGroup;
pub use task_group::{DEFAULT_GROUP_NAME, TaskGroup};

pub(crate) use task_group::attempt;
