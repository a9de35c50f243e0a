//! `Executor`: the concurrency orchestrator. Spawns up to `max_concurrency`
//! workers, gates new admissions on the rate limiter, and evaluates the
//! composite run-end condition against the number of workers *dispatched*
//! rather than the number *completed* — so a run bounded by `max_requests`
//! never starts more than that many workers, regardless of how many are
//! still in flight when the bound is reached.

use loadbench_core::{RateLimiter, RunEndCondition};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use tracing::debug;

/// Grace period given to in-flight workers to finish after cancellation,
/// before the executor gives up waiting on them.
const CANCEL_GRACE_PERIOD: Duration = Duration::from_secs(5);

pub struct Executor {
    rate_limiter: Arc<dyn RateLimiter>,
    max_concurrency: usize,
    run_end: RunEndCondition,
}

impl Executor {
    pub fn new(rate_limiter: Arc<dyn RateLimiter>, max_concurrency: usize, run_end: RunEndCondition) -> Self {
        Self {
            rate_limiter,
            max_concurrency,
            run_end,
        }
    }

    /// Drive `worker` to completion according to the run-end condition,
    /// observing `cancel` (intended to be notified from a Ctrl-C/SIGTERM
    /// handler) at every suspension point. Returns the number of workers
    /// that completed.
    pub async fn run<W, Fut>(&self, worker: W, cancel: Arc<Notify>) -> u64
    where
        W: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let worker = Arc::new(worker);
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency.max(1)));
        // Counts workers *started*, used to gate further admission so the
        // request bound can't be overshot. `completed` (below) counts
        // workers that have actually finished, and is only ever <=
        // `dispatched`, so it never overshoots either.
        let dispatched = Arc::new(AtomicU64::new(0));
        let completed = Arc::new(AtomicU64::new(0));
        let start = Instant::now();
        let mut tasks = JoinSet::new();
        let mut cancelled = false;

        loop {
            if self
                .run_end
                .is_satisfied(dispatched.load(Ordering::SeqCst), start.elapsed().as_secs_f64())
            {
                break;
            }

            let delay = self.rate_limiter.backoff();
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.notified() => { cancelled = true; break; }
            }

            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => permit.expect("semaphore never closed"),
                _ = cancel.notified() => { cancelled = true; break; }
            };

            // Re-check after waiting: the wait itself may have pushed us past
            // the run-end bound.
            if self
                .run_end
                .is_satisfied(dispatched.load(Ordering::SeqCst), start.elapsed().as_secs_f64())
            {
                drop(permit);
                break;
            }

            dispatched.fetch_add(1, Ordering::SeqCst);
            let worker = worker.clone();
            let completed = completed.clone();
            tasks.spawn(async move {
                let _permit = permit;
                (&*worker)().await;
                completed.fetch_add(1, Ordering::SeqCst);
            });
        }

        if cancelled {
            debug!("cancellation observed, draining in-flight workers");
            let grace = tokio::time::sleep(CANCEL_GRACE_PERIOD);
            tokio::pin!(grace);
            loop {
                tokio::select! {
                    next = tasks.join_next() => {
                        if next.is_none() {
                            break;
                        }
                    }
                    _ = &mut grace => {
                        debug!("grace period elapsed with workers still in flight");
                        break;
                    }
                }
            }
        } else {
            while tasks.join_next().await.is_some() {}
        }

        completed.load(Ordering::SeqCst)
    }
}
