//! # SubscriberSet: fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`] to every subscriber in
//! registration order.
//!
//! ## What it guarantees
//! - Per-subscriber order equals report order.
//! - Panics inside subscribers are caught and logged (isolation); the other
//!   subscribers still receive the event.
//!
//! ## Diagram
//! ```text
//!    emit(&Event)
//!        ├────────────────► S1.on_event()
//!        ├────────────────► S2.on_event()
//!        └────────────────► SN.on_event()
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::events::Event;

use super::{LogWriter, Subscribe};

/// Composite fan-out over subscribers. Cheap to clone.
#[derive(Clone)]
pub struct SubscriberSet {
    subs: Arc<[Arc<dyn Subscribe>]>,
}

impl SubscriberSet {
    /// Creates a set over the given subscribers.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        Self { subs: subs.into() }
    }

    /// A set that drops every event.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Delivers one event to every subscriber.
    pub fn emit(&self, event: &Event) {
        for sub in self.subs.iter() {
            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| sub.on_event(event))) {
                tracing::error!(
                    subscriber = sub.name(),
                    panic = ?panic_err,
                    "subscriber panicked"
                );
            }
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subs.len()
    }
}

impl Default for SubscriberSet {
    /// A set holding only the [`LogWriter`].
    fn default() -> Self {
        Self::new(vec![Arc::new(LogWriter::new())])
    }
}

impl std::fmt::Debug for SubscriberSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.subs.iter().map(|s| s.name()))
            .finish()
    }
}
