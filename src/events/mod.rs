//! Engine events reported to subscribers.
//!
//! This module holds the event **data model**: [`EventKind`] and [`Event`].
//! Events are handed synchronously to a
//! [`SubscriberSet`](crate::subscribers::SubscriberSet); the default subscriber
//! is [`LogWriter`](crate::subscribers::LogWriter).
//!
//! ## Quick reference
//! - **Publishers**: `TaskGroup`, `RunGroup`, `WorkerPool`, `CronJob`,
//!   `TickDispatcher`, `Shutdown` (through `Engine::serve`).
//! - **Consumers**: any [`Subscribe`](crate::subscribers::Subscribe) implementation.

mod event;

pub use event::{Event, EventKind};
