//! # Runner / Closer capabilities and the [`Activity`] pair.
//!
//! - [`Runner`]: a blocking unit of work: runs until done, failed or cancelled.
//! - [`Closer`]: releases what a runner acquired.
//! - [`RunFn`]: closure-backed runner.
//! - [`Activity`]: a runner plus an optional closer, decided when it is built.
//!
//! A runner receives a [`Context`] and should check it regularly to stop
//! cooperatively. Nothing in this crate aborts a running runner: a runner that
//! ignores its context runs to completion and is waited for.

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Error;

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use actvisor::{Context, Error, Runner};
///
/// struct Demo;
///
/// #[async_trait]
/// impl Runner for Demo {
///     async fn run(&self, ctx: Context) -> Result<(), Error> {
///         if let Some(err) = ctx.err() {
///             return Err(err.into());
///         }
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Executes until completion, failure or cancellation of `ctx`.
    async fn run(&self, ctx: Context) -> Result<(), Error>;

    /// Human-readable name (for logs and reports).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// # Resource release for a [`Runner`].
///
/// May be called before, during or after `run`; implementations must be race-free.
#[async_trait]
pub trait Closer: Send + Sync + 'static {
    /// Releases resources held by the runner.
    async fn close(&self, ctx: Context) -> Result<(), Error>;
}

#[async_trait]
impl<T: Runner + ?Sized> Runner for Arc<T> {
    async fn run(&self, ctx: Context) -> Result<(), Error> {
        (**self).run(ctx).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[async_trait]
impl<T: Closer + ?Sized> Closer for Arc<T> {
    async fn close(&self, ctx: Context) -> Result<(), Error> {
        (**self).close(ctx).await
    }
}

#[async_trait]
impl<T: Runner + ?Sized> Runner for Box<T> {
    async fn run(&self, ctx: Context) -> Result<(), Error> {
        (**self).run(ctx).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Function-backed runner.
///
/// Wraps a closure that *creates* a new future per run, so the same `RunFn`
/// can be looped or scheduled repeatedly. Share state through `Arc<...>`
/// captured by the closure.
///
/// ```rust
/// use actvisor::{Context, Error, RunFn, Runner};
///
/// let r = RunFn::new("hello", |_ctx: Context| async { Ok::<_, Error>(()) });
/// assert_eq!(r.name(), "hello");
/// ```
pub struct RunFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> RunFn<F> {
    /// Creates a new function-backed runner.
    pub fn new<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the runner and returns it as a shared handle.
    pub fn arc<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Error>> + Send + 'static,
    {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Runner for RunFn<F>
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    async fn run(&self, ctx: Context) -> Result<(), Error> {
        (self.f)(ctx).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// # A runner with an optional closer.
///
/// Whether an activity can be closed is decided when it is built, not by
/// inspecting the runner at run time. Closing an activity built with
/// [`Activity::new`] is a no-op.
#[derive(Clone)]
pub struct Activity {
    runner: Arc<dyn Runner>,
    closer: Option<Arc<dyn Closer>>,
}

impl Activity {
    /// Activity without cleanup.
    pub fn new(runner: impl Runner) -> Self {
        Self {
            runner: Arc::new(runner),
            closer: None,
        }
    }

    /// Activity whose runner is also its closer.
    pub fn closeable<T: Runner + Closer>(shared: Arc<T>) -> Self {
        Self {
            runner: shared.clone(),
            closer: Some(shared),
        }
    }

    /// Activity with a separate closer.
    pub fn with_closer(runner: impl Runner, closer: impl Closer) -> Self {
        Self {
            runner: Arc::new(runner),
            closer: Some(Arc::new(closer)),
        }
    }

    /// Returns `true` if a closer is attached.
    pub fn has_closer(&self) -> bool {
        self.closer.is_some()
    }

    /// Shared handle to the runner half.
    pub fn runner(&self) -> Arc<dyn Runner> {
        Arc::clone(&self.runner)
    }

    /// Releases the activity's resources (no-op without a closer).
    pub async fn close(&self, ctx: Context) -> Result<(), Error> {
        match &self.closer {
            Some(closer) => closer.close(ctx).await,
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Runner for Activity {
    async fn run(&self, ctx: Context) -> Result<(), Error> {
        self.runner.run(ctx).await
    }

    fn name(&self) -> &str {
        self.runner.name()
    }
}

impl std::fmt::Debug for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Activity")
            .field("name", &self.runner.name())
            .field("closeable", &self.closer.is_some())
            .finish()
    }
}
