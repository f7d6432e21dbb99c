//! # WithWait: completion tracking for submitted tasks.
//!
//! ```text
//! schedule(task) ─► barrier += 1 ─► inner.schedule(Tracked { task, guard })
//!                                         │
//!             task finished ─► record first error ─► barrier -= 1
//!             task discarded by the pool ─► guard dropped ─► barrier -= 1
//!
//! Waiter::wait() ─► until barrier == 0 ─► first error (or Ok)
//! ```

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Error;
use crate::runner::Runner;
use crate::sync::{WaitGroup, WaitGuard};

use super::Scheduler;

/// Scheduler decorator that tracks every submitted task.
///
/// Created together with its [`Waiter`] by [`with_wait`].
#[derive(Debug)]
pub struct WithWait<S> {
    inner: S,
    wg: WaitGroup,
    first: Arc<FirstError>,
}

/// Waits for the tasks submitted through the paired [`WithWait`].
#[derive(Clone, Debug)]
pub struct Waiter {
    wg: WaitGroup,
    first: Arc<FirstError>,
}

#[derive(Default, Debug)]
struct FirstError(Mutex<Option<Error>>);

impl FirstError {
    fn record(&self, err: &Error) {
        let mut slot = self.0.lock().unwrap_or_else(|p| p.into_inner());
        if slot.is_none() {
            *slot = Some(err.clone());
        }
    }

    fn get(&self) -> Option<Error> {
        self.0.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

/// Wraps `inner` so that completion of every submitted task can be awaited.
///
/// # Example
/// ```no_run
/// use actvisor::{Context, RunFn, Scheduler, Size, WorkerPool, with_wait};
///
/// # async fn demo() -> Result<(), actvisor::Error> {
/// let ctx = Context::new();
/// let (pool, waiter) = with_wait(WorkerPool::new(&ctx, Size::Constant(2)));
///
/// pool.schedule(&ctx, RunFn::arc("job", |_ctx: Context| async { Ok(()) })).await?;
/// waiter.wait().await?;
/// # Ok(())
/// # }
/// ```
pub fn with_wait<S: Scheduler>(inner: S) -> (WithWait<S>, Waiter) {
    let wg = WaitGroup::new();
    let first = Arc::new(FirstError::default());
    let waiter = Waiter {
        wg: wg.clone(),
        first: Arc::clone(&first),
    };
    (WithWait { inner, wg, first }, waiter)
}

impl<S> WithWait<S> {
    /// The wrapped scheduler.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Scheduler> Scheduler for WithWait<S> {
    async fn schedule(&self, ctx: &Context, task: Arc<dyn Runner>) -> Result<(), Error> {
        let tracked = Tracked {
            task,
            guard: Mutex::new(Some(self.wg.add())),
            first: Arc::clone(&self.first),
        };
        self.inner.schedule(ctx, Arc::new(tracked)).await
    }
}

impl Waiter {
    /// Completes once every task submitted so far has finished.
    ///
    /// Returns a copy of the first error any of them returned.
    pub async fn wait(&self) -> Result<(), Error> {
        self.wg.wait().await;
        match self.first.get() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Number of submitted tasks that have not finished.
    pub fn pending(&self) -> usize {
        self.wg.count()
    }
}

struct Tracked {
    task: Arc<dyn Runner>,
    guard: Mutex<Option<WaitGuard>>,
    first: Arc<FirstError>,
}

#[async_trait]
impl Runner for Tracked {
    async fn run(&self, ctx: Context) -> Result<(), Error> {
        let res = self.task.run(ctx).await;
        if let Err(err) = &res {
            self.first.record(err);
        }
        drop(self.guard.lock().unwrap_or_else(|p| p.into_inner()).take());
        res
    }

    fn name(&self) -> &str {
        self.task.name()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::pool::{Size, WorkerPool};
    use crate::runner::RunFn;
    use crate::subscribers::SubscriberSet;

    fn pool(ctx: &Context, n: usize) -> WorkerPool {
        WorkerPool::new(ctx, Size::Constant(n)).with_subscribers(SubscriberSet::empty())
    }

    #[tokio::test]
    async fn waits_for_every_task() {
        let ctx = Context::new();
        let (sched, waiter) = with_wait(pool(&ctx, 2));
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..6 {
            let d = done.clone();
            sched
                .schedule(
                    &ctx,
                    RunFn::arc("sleepy", move |_ctx: Context| {
                        let d = d.clone();
                        async move {
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            d.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        }
                    }),
                )
                .await
                .unwrap();
        }

        assert!(waiter.wait().await.is_ok());
        assert_eq!(done.load(Ordering::SeqCst), 6);
        assert_eq!(waiter.pending(), 0);
    }

    #[tokio::test]
    async fn first_error_is_returned() {
        let ctx = Context::new();
        let (sched, waiter) = with_wait(pool(&ctx, 1));

        let failing = RunFn::arc("a", |_ctx: Context| async { Err(Error::fail("first")) });
        sched.schedule(&ctx, failing).await.unwrap();
        let failing = RunFn::arc("b", |_ctx: Context| async { Err(Error::fail("second")) });
        sched.schedule(&ctx, failing).await.unwrap();

        let err = waiter.wait().await.unwrap_err();
        assert_eq!(err.to_string(), "execution failed: first");
        // Repeated waits keep reporting it.
        assert!(waiter.clone().wait().await.is_err());
    }

    #[tokio::test]
    async fn rejected_task_is_released() {
        let ctx = Context::new();
        let (sched, waiter) = with_wait(pool(&ctx, 1));

        let ended = Context::new();
        ended.cancel();
        let res = sched
            .schedule(&ended, RunFn::arc("never", |ctx: Context| async move {
                match ctx.err() {
                    Some(err) => Err(err.into()),
                    None => Ok(()),
                }
            }))
            .await;

        assert!(res.is_err());
        let err = waiter.wait().await.unwrap_err();
        assert!(err.is_cancellation());
    }
}
