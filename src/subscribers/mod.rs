//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the default [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! TaskGroup / RunGroup / WorkerPool / CronJob
//!            │ report(Event)
//!            ▼
//!      SubscriberSet::emit(&Event)
//!            ├──► LogWriter::on_event   (tracing)
//!            ├──► Metrics::on_event     (user)
//!            └──► ...
//! ```
//!
//! Subscribers are the only place where errors swallowed by fire-and-forget
//! paths (`TaskGroup::run`, `WorkerPool::schedule`) become visible.

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
