//! # RunGroup: fail-fast composition of activities.
//!
//! A [`RunGroup`] is itself a [`Runner`]: running it runs every member
//! concurrently under one derived context.
//!
//! ```text
//! RunGroup::run(ctx)
//!   group = ctx.child()
//!   ├─► member[0].run(group) ─► member[0].close(group)
//!   ├─► member[1].run(group) ─► member[1].close(group)
//!   └─► ...
//!   first Err ─► group.cancel()   (siblings observe cancellation)
//!   all joined ─► return first Err (or Ok)
//! ```
//!
//! ## Rules
//! - Every member is closed after its own `run` returns, whatever the outcome.
//! - Close errors are reported ([`EventKind::CloseFailed`]), never returned.
//! - The returned error is the first one recorded, in time order.
//! - A member panic counts as a failure ([`Error::Panicked`]).

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::FutureExt;
use tokio::task::JoinSet;

use crate::context::Context;
use crate::error::Error;
use crate::events::{Event, EventKind};
use crate::runner::{Activity, Runner};
use crate::subscribers::SubscriberSet;

/// Runs a fixed list of activities; stops all of them when the first one fails.
#[derive(Debug)]
pub struct RunGroup {
    name: Arc<str>,
    members: Vec<Activity>,
    subs: SubscriberSet,
}

impl RunGroup {
    /// Creates a group over `members` reporting to the default [`LogWriter`](crate::LogWriter).
    pub fn new(members: Vec<Activity>) -> Self {
        Self {
            name: Arc::from("run-group"),
            members,
            subs: SubscriberSet::default(),
        }
    }

    /// Replaces the subscribers close failures are reported to.
    pub fn with_subscribers(mut self, subs: SubscriberSet) -> Self {
        self.subs = subs;
        self
    }

    /// Renames the group (used as `source` in reports).
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Number of member activities.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// First error recorded by any member.
#[derive(Default)]
struct FirstError(Mutex<Option<Error>>);

impl FirstError {
    fn record(&self, err: Error) {
        let mut slot = self.0.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn take(&self) -> Option<Error> {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).take()
    }
}

#[async_trait]
impl Runner for RunGroup {
    async fn run(&self, ctx: Context) -> Result<(), Error> {
        let group = ctx.child();
        let first = Arc::new(FirstError::default());
        let mut set = JoinSet::new();

        for member in &self.members {
            let member = member.clone();
            let group = group.clone();
            let first = Arc::clone(&first);
            let source = Arc::clone(&self.name);
            let subs = self.subs.clone();

            set.spawn(async move {
                let res = AssertUnwindSafe(member.run(group.clone()))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(Error::Panicked {
                            task: member.name().to_string(),
                        })
                    });

                if let Err(err) = res {
                    first.record(err);
                    group.cancel();
                }

                if let Err(err) = member.close(group).await {
                    subs.emit(
                        &Event::new(EventKind::CloseFailed)
                            .with_source(source)
                            .with_task(member.name())
                            .with_reason(err.to_string()),
                    );
                }
            });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(join_err) = joined {
                // Only a panicking closer can get here.
                first.record(Error::Panicked {
                    task: format!("closer ({join_err})"),
                });
                group.cancel();
            }
        }
        group.cancel();

        match first.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
