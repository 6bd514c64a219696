//! Sync job orchestrator.
//!
//! Owns SyncJob state exclusively. Jobs are created by `enqueue` and
//! executed by `run`, decoupled through the job store so a queued job
//! survives a restart and the worker claims it later. Per-unit errors are
//! recorded in the job's results and never escape the batch loop; only
//! unrecoverable errors fail a whole job.

use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use shopsync_core::{JobId, ResourceType, SyncDirection, TenantId};
use shopsync_store::{
    JobKind, JobOptions, JobStatus, LogLevel, ResourceTarget, StockSource, Stores, SyncJob, Tenant,
};

use crate::client::PlatformClient;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::reconciler::{Reconciler, UnitContext, UnitOutcome};
use crate::retry::RetryPolicy;

/// Resource types enumerated by a full catalog sync.
const FULL_SYNC_TYPES: [ResourceType; 2] = [ResourceType::Product, ResourceType::Collection];

/// Top-level sync job state machine.
pub struct Orchestrator {
    stores: Stores,
    reconciler: Arc<Reconciler>,
    platform: Arc<dyn PlatformClient>,
    config: EngineConfig,
    retry: RetryPolicy,
}

impl Orchestrator {
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(
        stores: Stores,
        reconciler: Arc<Reconciler>,
        platform: Arc<dyn PlatformClient>,
        config: EngineConfig,
    ) -> Self {
        let retry = RetryPolicy::from_config(&config);
        Self {
            stores,
            reconciler,
            platform,
            config,
            retry,
        }
    }

    /// Validate and create a job in `queued` status. Returns immediately;
    /// execution happens when a worker picks the job up.
    #[instrument(skip(self, targets, options), fields(tenant_id = %tenant_id, kind = kind.as_str()))]
    pub async fn enqueue(
        &self,
        tenant_id: TenantId,
        kind: JobKind,
        direction: SyncDirection,
        targets: Vec<ResourceTarget>,
        options: JobOptions,
    ) -> EngineResult<SyncJob> {
        // An ambiguous no-target request is rejected, never silently
        // promoted to a full sync.
        if kind != JobKind::Full && targets.is_empty() {
            return Err(EngineError::validation(
                "target set must be non-empty for non-full jobs",
            ));
        }
        if kind == JobKind::Full && !targets.is_empty() {
            return Err(EngineError::validation(
                "full sync does not accept explicit targets",
            ));
        }
        self.stores.tenants.get_active(tenant_id).await?;

        let job = SyncJob::new(tenant_id, kind, direction, targets, options);
        self.stores.jobs.insert(job.clone()).await?;
        info!(job_id = %job.id, "Sync job enqueued");
        Ok(job)
    }

    /// Execute a queued job to a terminal status. The `queued ->
    /// in_progress` transition doubles as the worker's claim; a second
    /// concurrent `run` for the same job gets an invalid-transition error.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn run(&self, job_id: JobId) -> EngineResult<()> {
        let job = self
            .stores
            .jobs
            .update(job_id, |j| {
                j.start()?;
                Ok(j.clone())
            })
            .await?;
        info!(kind = job.kind.as_str(), "Sync job started");

        let tenant = match self.stores.tenants.get_active(job.tenant_id).await {
            Ok(tenant) => tenant,
            Err(e) => {
                self.fail_job(job_id, format!("tenant unavailable: {e}")).await;
                return Ok(());
            }
        };

        let result = match job.kind {
            JobKind::Full => self.run_full(&tenant, &job).await,
            _ => self.run_targets(&tenant, &job).await,
        };

        match result {
            Ok(()) => {
                self.finish_job(job_id).await;
                Ok(())
            }
            Err(e) if e.is_unrecoverable() => {
                self.fail_job(job_id, e.to_string()).await;
                Ok(())
            }
            Err(e) => {
                self.fail_job(job_id, e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Cancel a job. Legal only while queued or in progress; the unit in
    /// flight finishes and its result is still recorded.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn cancel(&self, tenant_id: TenantId, job_id: JobId) -> EngineResult<SyncJob> {
        let job = self
            .stores
            .jobs
            .update(job_id, |j| {
                if j.tenant_id != tenant_id {
                    return Err(shopsync_store::StoreError::not_found(
                        "job",
                        job_id.to_string(),
                    ));
                }
                j.cancel()?;
                Ok(j.clone())
            })
            .await?;
        info!("Sync job cancelled");
        Ok(job)
    }

    /// Targeted jobs: one unit per explicit target.
    async fn run_targets(&self, tenant: &Tenant, job: &SyncJob) -> EngineResult<()> {
        self.stores
            .jobs
            .update(job.id, |j| j.set_total(job.targets.len() as u64))
            .await?;

        let ctx = self.unit_context(job);
        for target in &job.targets {
            if self.is_cancelled(job.id).await {
                info!("Cancellation observed, no further units scheduled");
                return Ok(());
            }
            self.execute_unit(tenant, job.id, target.resource_type, &target.platform_id, &ctx)
                .await;
        }
        Ok(())
    }

    /// Full sync: size the job from the platform counts, then paginate
    /// fixed-size batches. A failed item still advances progress. Stock
    /// levels join the run when the job opts in, enumerated by variant.
    async fn run_full(&self, tenant: &Tenant, job: &SyncJob) -> EngineResult<()> {
        let mut sync_types: Vec<ResourceType> = FULL_SYNC_TYPES.to_vec();
        if job.options.include_inventory {
            sync_types.push(ResourceType::Variant);
        }
        let mut totals = Vec::with_capacity(sync_types.len());
        for resource_type in &sync_types {
            let count = self
                .platform
                .count_resources(tenant.id, *resource_type)
                .await
                .map_err(|e| {
                    EngineError::unrecoverable(format!(
                        "cannot enumerate {resource_type} targets: {e}"
                    ))
                })?;
            totals.push(count);
        }
        let total: usize = totals.iter().sum();
        self.stores
            .jobs
            .update(job.id, |j| {
                j.set_total(total as u64)?;
                j.push_log(
                    LogLevel::Info,
                    format!("full sync sized at {total} units"),
                );
                Ok(())
            })
            .await?;

        let ctx = self.unit_context(job);
        for (resource_type, count) in sync_types.into_iter().zip(totals) {
            // A variant page is reconciled as one inventory unit per
            // variant id.
            let unit_type = if resource_type == ResourceType::Variant {
                ResourceType::Inventory
            } else {
                resource_type
            };
            let pages = count.div_ceil(self.config.batch_size);
            for page in 0..pages {
                if self.is_cancelled(job.id).await {
                    info!("Cancellation observed, no further units scheduled");
                    return Ok(());
                }
                let batch = self
                    .platform
                    .list_page(tenant.id, resource_type, page, self.config.batch_size)
                    .await
                    .map_err(|e| {
                        EngineError::unrecoverable(format!(
                            "cannot list {resource_type} page {page}: {e}"
                        ))
                    })?;
                debug!(page, items = batch.len(), "Processing full-sync batch");
                for snapshot in batch {
                    if self.is_cancelled(job.id).await {
                        info!("Cancellation observed, no further units scheduled");
                        return Ok(());
                    }
                    self.execute_unit(tenant, job.id, unit_type, &snapshot.id, &ctx)
                        .await;
                }
            }
        }
        Ok(())
    }

    /// Run one unit with its retry budget, record the outcome, and advance
    /// progress regardless of how the unit fared.
    async fn execute_unit(
        &self,
        tenant: &Tenant,
        job_id: JobId,
        resource_type: ResourceType,
        platform_id: &str,
        ctx: &UnitContext,
    ) {
        let mut attempt = 1;
        let outcome = loop {
            let attempt_result = tokio::time::timeout(
                self.config.attempt_timeout(),
                self.reconciler.reconcile(tenant, resource_type, platform_id, ctx),
            )
            .await
            .unwrap_or(Err(EngineError::Deadline {
                seconds: self.config.attempt_timeout_secs,
            }));

            match attempt_result {
                Ok(report) => break Ok(report.outcome),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts() => {
                    warn!(
                        platform_id,
                        attempt,
                        error = %e,
                        "Unit attempt failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay_before(attempt + 1)).await;
                    attempt += 1;
                }
                Err(e) => break Err(e),
            }
        };

        let platform_id = platform_id.to_string();
        let record_result = self
            .stores
            .jobs
            .update(job_id, |j| {
                match &outcome {
                    Ok(UnitOutcome::Synced) => j.record_success(&platform_id)?,
                    Ok(UnitOutcome::Skipped) => j.record_skipped(&platform_id)?,
                    Err(e) => {
                        j.record_failure(&platform_id, resource_type, e.code(), e.to_string())?;
                    }
                }
                j.advance_progress()
            })
            .await;
        if let Err(e) = record_result {
            // Terminal-state race with cancel; the outcome is dropped by
            // job immutability rules.
            warn!(error = %e, "Could not record unit outcome");
        }
    }

    fn unit_context(&self, job: &SyncJob) -> UnitContext {
        UnitContext {
            direction: job.direction,
            options: job.options,
            job_id: Some(job.id),
            stock_source: match job.kind {
                JobKind::Full => StockSource::FullSync,
                JobKind::WebhookTriggered => StockSource::PlatformWebhook,
                JobKind::SingleResource | JobKind::Manual => StockSource::Manual,
            },
        }
    }

    async fn is_cancelled(&self, job_id: JobId) -> bool {
        match self.stores.jobs.get(job_id).await {
            Ok(job) => job.status == JobStatus::Cancelled,
            Err(_) => true,
        }
    }

    async fn finish_job(&self, job_id: JobId) {
        let result = self
            .stores
            .jobs
            .update(job_id, |j| {
                if j.status == JobStatus::InProgress {
                    j.complete()?;
                }
                Ok(j.clone())
            })
            .await;
        match result {
            Ok(job) => info!(
                job_id = %job_id,
                status = job.status.as_str(),
                success = job.results.success.count,
                failed = job.results.failed.count,
                skipped = job.results.skipped.count,
                "Sync job finished"
            ),
            Err(e) => error!(job_id = %job_id, error = %e, "Could not finish job"),
        }
    }

    async fn fail_job(&self, job_id: JobId, message: String) {
        error!(job_id = %job_id, message, "Sync job failed");
        let result = self
            .stores
            .jobs
            .update(job_id, |j| j.fail(message.clone()))
            .await;
        if let Err(e) = result {
            error!(job_id = %job_id, error = %e, "Could not mark job failed");
        }
    }
}
