use std::sync::Arc;

use crate::config::Config;
use crate::context::Context;
use crate::group::TaskGroup;
use crate::subscribers::{Subscribe, SubscriberSet};

use super::Engine;

/// Builder for an [`Engine`] with optional subscribers and parent context.
pub struct EngineBuilder {
    cfg: Config,
    subscribers: Option<Vec<Arc<dyn Subscribe>>>,
    parent: Option<Context>,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: None,
            parent: None,
        }
    }

    /// Sets event subscribers.
    ///
    /// Without this call the engine reports through [`LogWriter`](crate::LogWriter)
    /// only; an empty list silences reports entirely.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = Some(subscribers);
        self
    }

    /// Derives the engine's root context from `parent` instead of a fresh root.
    pub fn with_context(mut self, parent: &Context) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Builds the engine.
    pub fn build(self) -> Engine {
        let subs = match self.subscribers {
            Some(subs) => SubscriberSet::new(subs),
            None => SubscriberSet::default(),
        };
        let root = match &self.parent {
            Some(parent) => parent.child(),
            None => Context::new(),
        };
        let tasks = TaskGroup::with_subscribers(self.cfg.name.as_str(), subs.clone());

        Engine {
            cfg: self.cfg,
            root,
            tasks,
            subs,
        }
    }
}
