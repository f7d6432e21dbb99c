//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers into
//! the engine. Events are delivered synchronously from the reporting task, in
//! the order they are reported.
//!
//! ## Contract
//! - `on_event` must be quick and must not block: it runs on the reporting
//!   task. Hand the event to a channel if processing is slow.
//! - A panicking subscriber is isolated by the [`SubscriberSet`](super::SubscriberSet).
//!
//! ## Example
//! ```rust
//! use actvisor::{Event, EventKind, Subscribe};
//!
//! struct Audit;
//!
//! impl Subscribe for Audit {
//!     fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::CloseFailed {
//!             // write audit record...
//!         }
//!     }
//!     fn name(&self) -> &'static str { "audit" }
//! }
//! ```

use crate::events::Event;

/// Contract for event subscribers.
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
