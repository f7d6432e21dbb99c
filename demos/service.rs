//! A small service: a periodic report, a pool of workers fed by a producer loop,
//! and a signal listener. Stop it with Ctrl-C.
//!
//! ```text
//! RUST_LOG=actvisor=debug cargo run --example service
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use actvisor::{Activity, Config, Context, CronJob, Engine, Error, RunFn, Scheduler, sleep};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut cfg = Config::default();
    cfg.name = "demo".to_string();
    cfg.pool_size = 2;
    cfg.task_timeout = Duration::from_millis(750);
    let engine = Engine::new(cfg);

    let processed = Arc::new(AtomicU64::new(0));

    // Producer: submits one job per 200ms into the bounded pool.
    let pool = engine.pool();
    let p = processed.clone();
    let producer = Activity::new(RunFn::new("producer", move |ctx: Context| {
        let pool = pool.clone();
        let p = p.clone();
        async move {
            let mut n: u64 = 0;
            loop {
                sleep(&ctx, Duration::from_millis(200)).await?;
                n += 1;
                let p = p.clone();
                let job = RunFn::arc(format!("job-{n}"), move |ctx: Context| {
                    let p = p.clone();
                    async move {
                        // Every fifth job runs past its deadline.
                        let work = if n % 5 == 0 { 1000 } else { 300 };
                        sleep(&ctx, Duration::from_millis(work)).await?;
                        p.fetch_add(1, Ordering::Relaxed);
                        Ok(())
                    }
                });
                if let Err(err) = pool.schedule(&ctx, job).await {
                    tracing::warn!(error = %err, "job not admitted");
                }
            }
        }
    }));

    let p = processed.clone();
    let report = Arc::new(CronJob::new(
        move || {
            let p = p.clone();
            Activity::new(RunFn::new("report", move |_ctx: Context| {
                let p = p.clone();
                async move {
                    tracing::info!(processed = p.load(Ordering::Relaxed), "report");
                    Ok(())
                }
            }))
        },
        "@every 2s",
    ));

    let res = engine
        .serve(vec![producer, Activity::closeable(report)])
        .await;
    match &res {
        Ok(()) => tracing::info!("service stopped"),
        Err(err) => tracing::info!(reason = %err, "service stopped"),
    }

    engine.shutdown();
    engine.wait().await;
    Ok(())
}
