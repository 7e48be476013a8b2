//! Bounded worker pool for long-running asynchronous jobs.
//!
//! Submission order of preference: a bounded queue drained by `core_size`
//! long-lived workers; then an overflow worker if fewer than `max_size`
//! workers are busy; then the saturation policy. `CallerRuns` executes the
//! job on the submitting task, `Reject` returns [`PoolError::Saturated`].

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex as AsyncMutex, Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// What to do when the queue is full and every worker is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaturationPolicy {
    /// Run the job on the submitting task.
    CallerRuns,
    /// Refuse the job.
    Reject,
}

/// Pool sizing and shutdown behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Name used in logs.
    pub name: String,
    /// Long-lived workers draining the queue.
    pub core_size: usize,
    /// Upper bound on concurrently running jobs, overflow included.
    pub max_size: usize,
    /// Jobs that may wait in the queue.
    pub queue_capacity: usize,
    /// Grace period for draining on shutdown.
    pub await_termination: Duration,
    /// Behaviour when saturated.
    pub saturation_policy: SaturationPolicy,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            name: "worker".to_owned(),
            core_size: 4,
            max_size: 8,
            queue_capacity: 100,
            await_termination: Duration::from_secs(30),
            saturation_policy: SaturationPolicy::CallerRuns,
        }
    }
}

/// How a submitted job was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Enqueued for a core worker.
    Queued,
    /// Started on an overflow worker.
    Overflow,
    /// Already ran to completion on the submitting task.
    RanOnCaller,
}

/// Submission failures.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    /// Queue full, all workers busy, and the policy is `Reject`.
    #[error("worker pool saturated")]
    Saturated,
    /// The pool has been shut down.
    #[error("worker pool is shut down")]
    ShutDown,
}

/// Result of [`WorkerPool::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// `true` if every worker finished within the grace period.
    pub drained: bool,
    /// Workers aborted after the grace period.
    pub aborted: usize,
}

/// A bounded pool of Tokio tasks.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    queue: Mutex<Option<mpsc::Sender<Job>>>,
    overflow: Arc<Semaphore>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_job(pool: &str, job: Job) {
    if AssertUnwindSafe(job).catch_unwind().await.is_err() {
        error!(pool, "worker job panicked");
    }
}

impl WorkerPool {
    /// Creates the pool and spawns its core workers.
    ///
    /// Sizes are normalised: at least one core worker, `max_size >=
    /// core_size`, and a queue of at least one slot. Must be called from
    /// within a Tokio runtime.
    #[must_use]
    pub fn new(mut config: WorkerPoolConfig) -> Self {
        config.core_size = config.core_size.max(1);
        config.max_size = config.max_size.max(config.core_size);
        config.queue_capacity = config.queue_capacity.max(1);

        let (tx, rx) = mpsc::channel::<Job>(config.queue_capacity);
        let rx = Arc::new(AsyncMutex::new(rx));
        let workers = (0..config.core_size)
            .map(|id| {
                let rx = Arc::clone(&rx);
                let name = config.name.clone();
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        match next {
                            Some(job) => run_job(&name, job).await,
                            None => break,
                        }
                    }
                    debug!(pool = %name, worker = id, "core worker stopped");
                })
            })
            .collect();

        info!(
            pool = %config.name,
            core_size = config.core_size,
            max_size = config.max_size,
            queue_capacity = config.queue_capacity,
            "worker pool started"
        );

        Self {
            overflow: Arc::new(Semaphore::new(config.max_size - config.core_size)),
            queue: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            config,
        }
    }

    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    /// Jobs currently waiting in the queue.
    #[must_use]
    pub fn queued(&self) -> usize {
        lock(&self.queue)
            .as_ref()
            .map_or(0, |tx| tx.max_capacity() - tx.capacity())
    }

    /// Submits a job.
    ///
    /// With `CallerRuns`, a saturated pool runs `job` to completion before
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns `PoolError::ShutDown` after shutdown, or
    /// `PoolError::Saturated` when saturated under `Reject`.
    pub async fn submit<F>(&self, job: F) -> Result<Submission, PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Some(tx) = lock(&self.queue).clone() else {
            return Err(PoolError::ShutDown);
        };

        let job = match tx.try_send(Box::pin(job)) {
            Ok(()) => return Ok(Submission::Queued),
            Err(TrySendError::Closed(_)) => return Err(PoolError::ShutDown),
            Err(TrySendError::Full(job)) => job,
        };

        if let Ok(permit) = Arc::clone(&self.overflow).try_acquire_owned() {
            let name = self.config.name.clone();
            let handle = tokio::spawn(async move {
                run_job(&name, job).await;
                drop(permit);
            });
            let mut workers = lock(&self.workers);
            workers.retain(|w| !w.is_finished());
            workers.push(handle);
            return Ok(Submission::Overflow);
        }

        match self.config.saturation_policy {
            SaturationPolicy::CallerRuns => {
                warn!(pool = %self.config.name, "worker pool saturated, running job on caller");
                run_job(&self.config.name, job).await;
                Ok(Submission::RanOnCaller)
            }
            SaturationPolicy::Reject => {
                warn!(pool = %self.config.name, "worker pool saturated, rejecting job");
                Err(PoolError::Saturated)
            }
        }
    }

    /// Stops accepting jobs and waits for queued and running jobs to finish
    /// within the configured grace period. Workers still running after it are
    /// aborted.
    pub async fn shutdown(&self) -> ShutdownReport {
        drop(lock(&self.queue).take());
        let workers = std::mem::take(&mut *lock(&self.workers));
        let aborters: Vec<_> = workers.iter().map(JoinHandle::abort_handle).collect();

        let drained = tokio::time::timeout(self.config.await_termination, join_all(workers))
            .await
            .is_ok();
        let mut aborted = 0;
        if drained {
            info!(pool = %self.config.name, "worker pool drained");
        } else {
            for handle in aborters.iter().filter(|a| !a.is_finished()) {
                handle.abort();
                aborted += 1;
            }
            warn!(
                pool = %self.config.name,
                aborted,
                grace_seconds = self.config.await_termination.as_secs(),
                "worker pool did not drain in time"
            );
        }
        ShutdownReport { drained, aborted }
    }
}
