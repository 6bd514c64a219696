//! Sync worker.
//!
//! Background worker that claims queued jobs and drives them through the
//! orchestrator. Bounded concurrency, graceful shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::time::interval;
use tracing::{debug, error, info, instrument};

use shopsync_store::JobStore;

use crate::lock::LockRegistry;
use crate::orchestrator::Orchestrator;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of jobs executed concurrently.
    pub concurrency: usize,

    /// How often to poll for queued jobs (in milliseconds).
    pub poll_interval_ms: u64,

    /// How often to purge released per-resource locks (in seconds).
    pub lock_purge_interval_secs: u64,

    /// Maximum jobs claimed per poll.
    pub batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval_ms: 500,
            lock_purge_interval_secs: 60,
            batch_size: 10,
        }
    }
}

/// Worker that executes queued sync jobs.
pub struct SyncWorker {
    orchestrator: Arc<Orchestrator>,
    jobs: Arc<JobStore>,
    locks: Arc<LockRegistry>,
    config: WorkerConfig,
    shutdown: Arc<AtomicBool>,
}

impl SyncWorker {
    /// Create a new worker.
    #[must_use]
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        jobs: Arc<JobStore>,
        locks: Arc<LockRegistry>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            orchestrator,
            jobs,
            locks,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the worker loop.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        info!(
            concurrency = self.config.concurrency,
            poll_interval_ms = self.config.poll_interval_ms,
            "Starting sync worker"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let mut poll_interval = interval(Duration::from_millis(self.config.poll_interval_ms));
        let mut purge_interval =
            interval(Duration::from_secs(self.config.lock_purge_interval_secs));

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    if self.shutdown.load(Ordering::Relaxed) {
                        info!("Worker shutdown requested, stopping poll loop");
                        break;
                    }
                    self.poll_and_run(&semaphore).await;
                }
                _ = purge_interval.tick() => {
                    self.locks.purge_released();
                }
            }
        }

        // Wait for in-flight jobs to complete
        info!("Waiting for in-flight jobs to complete...");
        let _ = semaphore.acquire_many(self.config.concurrency as u32).await;
        info!("Worker stopped");
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        info!("Shutdown requested");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown was requested.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Claim queued jobs and run them on background tasks.
    async fn poll_and_run(&self, semaphore: &Arc<Semaphore>) {
        let queued = self.jobs.queued(self.config.batch_size).await;
        if queued.is_empty() {
            return;
        }
        debug!(count = queued.len(), "Claimed queued jobs");

        for job in queued {
            let permit = if let Ok(p) = semaphore.clone().try_acquire_owned() {
                p
            } else {
                debug!("All worker slots busy, leaving remaining jobs queued");
                return;
            };
            let orchestrator = self.orchestrator.clone();
            tokio::spawn(async move {
                let _permit = permit; // Hold permit until the job finishes
                if let Err(e) = orchestrator.run(job.id).await {
                    error!(job_id = %job.id, error = %e, "Job execution failed");
                }
            });
        }
    }
}
