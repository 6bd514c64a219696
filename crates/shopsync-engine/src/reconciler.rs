//! Reconciliation of a single (tenant, resource type, platform id) unit.
//!
//! The reconciler fetches current state from both sides, diffs the mapped
//! fields, defers every two-sided divergence to the conflict detector, and
//! writes the merged result to the record store and inventory ledger. It
//! always re-reads current state under the per-resource lock, so a unit
//! that lost a lock race observes the winner's writes.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, instrument, warn};

use shopsync_core::{FieldMapping, JobId, ResourceType, SyncDirection};
use shopsync_store::{
    CatalogRecord, ConflictRecord, ConflictResolution, FieldDiff, JobOptions, RecordState,
    StockSource, Stores, Tenant,
};

use crate::client::{AuthorityClient, PlatformClient, ResourceSnapshot};
use crate::config::EngineConfig;
use crate::conflict::{AutoResolveOutcome, ConflictDetector, Divergence};
use crate::diff::{merge_fields, to_authority_fields, MergeOutcome};
use crate::error::{EngineError, EngineResult};
use crate::lock::{LockKey, LockRegistry};

/// Per-unit outcome recorded in the job's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Both sides agree; the record is synced.
    Synced,
    /// A conflict remains pending; the record stays `pending` and the
    /// unit counts as skipped, not failed.
    Skipped,
}

/// Execution context for one unit, derived from the owning job.
#[derive(Debug, Clone)]
pub struct UnitContext {
    pub direction: SyncDirection,
    pub options: JobOptions,
    pub job_id: Option<JobId>,
    /// Recorded as the origin of any ledger changes this unit applies.
    pub stock_source: StockSource,
}

/// Result of one reconciliation pass.
#[derive(Debug)]
pub struct ReconcileReport {
    pub outcome: UnitOutcome,
    /// Conflicts touched during this pass, resolved or pending.
    pub conflicts: Vec<ConflictRecord>,
}

impl ReconcileReport {
    fn synced() -> Self {
        Self {
            outcome: UnitOutcome::Synced,
            conflicts: Vec::new(),
        }
    }
}

/// Reconciler service. Holds the client seams, the stores and the
/// per-resource lock registry.
pub struct Reconciler {
    platform: Arc<dyn PlatformClient>,
    authority: Arc<dyn AuthorityClient>,
    stores: Stores,
    detector: Arc<ConflictDetector>,
    locks: Arc<LockRegistry>,
    config: EngineConfig,
}

impl Reconciler {
    /// Create a new reconciler.
    #[must_use]
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        authority: Arc<dyn AuthorityClient>,
        stores: Stores,
        detector: Arc<ConflictDetector>,
        locks: Arc<LockRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            platform,
            authority,
            stores,
            detector,
            locks,
            config,
        }
    }

    /// Reconcile one unit. Tenant context is passed explicitly; there is
    /// no ambient lookup.
    #[instrument(skip(self, tenant, ctx), fields(tenant_id = %tenant.id, resource_type = %resource_type, platform_id))]
    pub async fn reconcile(
        &self,
        tenant: &Tenant,
        resource_type: ResourceType,
        platform_id: &str,
        ctx: &UnitContext,
    ) -> EngineResult<ReconcileReport> {
        let key = LockKey::new(tenant.id, resource_type, platform_id);
        let _guard = self.locks.acquire(&key, self.config.lock_wait()).await?;

        if resource_type == ResourceType::Inventory {
            return self.reconcile_inventory(tenant, platform_id, ctx).await;
        }
        self.reconcile_record(tenant, resource_type, platform_id, ctx)
            .await
    }

    async fn reconcile_record(
        &self,
        tenant: &Tenant,
        resource_type: ResourceType,
        platform_id: &str,
        ctx: &UnitContext,
    ) -> EngineResult<ReconcileReport> {
        let platform_snapshot = self
            .platform
            .fetch_resource(tenant.id, resource_type, platform_id)
            .await?;

        // Re-read the mirror under the lock; never operate on a snapshot
        // captured at enqueue time.
        let mut record = match self
            .stores
            .records
            .get(tenant.id, resource_type, platform_id)
            .await
        {
            Some(record) => record,
            None => {
                let snapshot = platform_snapshot.as_ref().ok_or_else(|| {
                    EngineError::permanent(format!(
                        "{resource_type} {platform_id} unknown on both sides"
                    ))
                })?;
                CatalogRecord::new(
                    tenant.id,
                    resource_type,
                    platform_id,
                    snapshot.fields.clone(),
                )
            }
        };

        let platform_snapshot = match platform_snapshot {
            Some(s) => s,
            // The platform no longer knows the entity at all; treat as a
            // platform-side deletion report.
            None => ResourceSnapshot::new(platform_id, record.fields.clone()).deleted(),
        };

        // Resolve the authority side: linked records fetch by id, unlinked
        // ones try the external-key lookup before concluding the entity is
        // new to the authority.
        let authority_snapshot = match &record.authority_id {
            Some(authority_id) => {
                let snapshot = self
                    .authority
                    .fetch_resource(tenant.id, resource_type, authority_id)
                    .await?;
                match snapshot {
                    Some(s) => s,
                    None => {
                        return Err(EngineError::permanent(format!(
                            "authority id {authority_id} referenced by {platform_id} not found"
                        )))
                    }
                }
            }
            None => {
                match self
                    .authority
                    .lookup_by_external_key(tenant.id, resource_type, platform_id)
                    .await?
                {
                    Some(existing) => {
                        // Both sides created the entity independently under
                        // the same external key. Never merged automatically.
                        return self
                            .creation_conflict(
                                tenant,
                                resource_type,
                                record,
                                &platform_snapshot,
                                &existing,
                                ctx.job_id,
                            )
                            .await;
                    }
                    None => {
                        return self
                            .create_on_authority(tenant, resource_type, record, &platform_snapshot)
                            .await;
                    }
                }
            }
        };

        // Deletion divergence is handled before field diffing.
        if platform_snapshot.deleted || authority_snapshot.deleted {
            return self
                .reconcile_deletion(
                    tenant,
                    resource_type,
                    record,
                    &platform_snapshot,
                    &authority_snapshot,
                    ctx.job_id,
                )
                .await;
        }

        let direction = record.sync_direction.unwrap_or(ctx.direction);
        let settled = self
            .detector
            .settlements(tenant.id, resource_type, platform_id)
            .await;
        let mut outcome = merge_fields(
            &tenant.field_mapping,
            &platform_snapshot,
            &authority_snapshot,
            direction,
            &settled,
        );
        if !ctx.options.include_images {
            exclude_images(
                &mut outcome,
                &platform_snapshot,
                &authority_snapshot,
                &tenant.field_mapping,
            );
        }

        let diverged = !outcome.conflicts.is_empty();
        if ctx.options.force && diverged {
            force_merge(&mut outcome, &platform_snapshot, &authority_snapshot, direction);
        }

        let mut touched = Vec::new();
        if !outcome.conflicts.is_empty() {
            let conflict = self
                .detector
                .detect(
                    tenant.id,
                    resource_type,
                    platform_id,
                    record.authority_id.clone(),
                    Divergence::Data {
                        field_diffs: outcome.conflicts.clone(),
                    },
                    ctx.job_id,
                )
                .await?;

            match self
                .detector
                .auto_resolve(tenant.id, conflict.id, tenant.resolution_policy)
                .await?
            {
                AutoResolveOutcome::Resolved(resolution) => {
                    for diff in &outcome.conflicts {
                        let value = match resolution {
                            ConflictResolution::UsePlatform => diff.platform_value.clone(),
                            ConflictResolution::UseAuthority => diff.authority_value.clone(),
                            // Auto resolution always picks a side.
                            ConflictResolution::KeepBoth => continue,
                        };
                        outcome.merged.insert(diff.field.clone(), value);
                    }
                    outcome.conflicts.clear();
                    if let Ok(c) = self.stores.conflicts.get(tenant.id, conflict.id).await {
                        touched.push(c);
                    }
                }
                AutoResolveOutcome::Unresolved => {
                    // Non-conflicting fields are still written; the record
                    // stays pending until an operator decides.
                    record.set_fields(outcome.merged.clone());
                    record.mark_pending();
                    self.stores.records.upsert(record).await?;
                    warn!(
                        conflict_id = %conflict.id,
                        fields = outcome.conflicts.len(),
                        "Reconciliation blocked behind pending conflict"
                    );
                    return Ok(ReconcileReport {
                        outcome: UnitOutcome::Skipped,
                        conflicts: vec![conflict],
                    });
                }
            }
        }

        self.write_back(tenant, resource_type, &mut record, &outcome, direction)
            .await?;
        // The mirror follows the platform's value wherever a divergence was
        // accepted as-is.
        let mut mirror = outcome.merged;
        for diff in &outcome.accepted {
            if !diff.platform_value.is_null() {
                mirror.insert(diff.field.clone(), diff.platform_value.clone());
            }
        }
        record.set_fields(mirror);
        record.mark_synced();
        self.stores.records.upsert(record).await?;

        if !diverged {
            if let Some(closed) = self
                .detector
                .close_converged(tenant.id, resource_type, platform_id)
                .await?
            {
                touched.push(closed);
            }
        }
        debug!("Unit reconciled clean");
        Ok(ReconcileReport {
            outcome: UnitOutcome::Synced,
            conflicts: touched,
        })
    }

    /// Push the merged values to whichever side is not the source of truth.
    /// Accepted divergences are written back with each side's own value so
    /// neither side is overwritten.
    async fn write_back(
        &self,
        tenant: &Tenant,
        resource_type: ResourceType,
        record: &mut CatalogRecord,
        outcome: &MergeOutcome,
        direction: SyncDirection,
    ) -> EngineResult<()> {
        let mut platform_fields = outcome.merged.clone();
        let mut authority_fields = to_authority_fields(&tenant.field_mapping, &outcome.merged);
        for diff in &outcome.accepted {
            if !diff.platform_value.is_null() {
                platform_fields.insert(diff.field.clone(), diff.platform_value.clone());
            }
            if let Some(authority_field) = tenant.field_mapping.authority_field(&diff.field) {
                if !diff.authority_value.is_null() {
                    authority_fields
                        .insert(authority_field.to_string(), diff.authority_value.clone());
                }
            }
        }
        match direction {
            SyncDirection::PlatformToAuthority => {
                let id = self
                    .authority
                    .write_resource(
                        tenant.id,
                        resource_type,
                        record.authority_id.as_deref(),
                        &record.platform_id,
                        &authority_fields,
                    )
                    .await?;
                record.link_authority(id)?;
            }
            SyncDirection::AuthorityToPlatform => {
                self.platform
                    .update_resource(tenant.id, resource_type, &record.platform_id, &platform_fields)
                    .await?;
            }
            SyncDirection::Bidirectional => {
                let id = self
                    .authority
                    .write_resource(
                        tenant.id,
                        resource_type,
                        record.authority_id.as_deref(),
                        &record.platform_id,
                        &authority_fields,
                    )
                    .await?;
                record.link_authority(id)?;
                self.platform
                    .update_resource(tenant.id, resource_type, &record.platform_id, &platform_fields)
                    .await?;
            }
        }
        Ok(())
    }

    /// First contact with the authority: create the entity there and link
    /// the record exactly once.
    async fn create_on_authority(
        &self,
        tenant: &Tenant,
        resource_type: ResourceType,
        mut record: CatalogRecord,
        platform_snapshot: &ResourceSnapshot,
    ) -> EngineResult<ReconcileReport> {
        if platform_snapshot.deleted {
            // Deleted on the platform and unknown to the authority; just
            // record the deletion.
            record.mark_deleted();
            record.mark_synced();
            self.stores.records.upsert(record).await?;
            return Ok(ReconcileReport::synced());
        }
        let mut merged = serde_json::Map::new();
        for (platform_field, _) in tenant.field_mapping.iter() {
            if let Some(v) = platform_snapshot.fields.get(platform_field) {
                if !v.is_null() {
                    merged.insert(platform_field.to_string(), v.clone());
                }
            }
        }
        let authority_fields = to_authority_fields(&tenant.field_mapping, &merged);
        let authority_id = self
            .authority
            .write_resource(
                tenant.id,
                resource_type,
                None,
                &record.platform_id,
                &authority_fields,
            )
            .await?;
        info!(authority_id, "Entity created on authority and linked");
        record.link_authority(authority_id)?;
        record.set_fields(merged);
        record.mark_synced();
        self.stores.records.upsert(record).await?;
        Ok(ReconcileReport::synced())
    }

    /// Both sides independently created an entity under the same external
    /// key. Critical, never auto-resolved.
    async fn creation_conflict(
        &self,
        tenant: &Tenant,
        resource_type: ResourceType,
        mut record: CatalogRecord,
        platform_snapshot: &ResourceSnapshot,
        authority_snapshot: &ResourceSnapshot,
        job_id: Option<JobId>,
    ) -> EngineResult<ReconcileReport> {
        let mut field_diffs = Vec::new();
        for (platform_field, authority_field) in tenant.field_mapping.iter() {
            let p = platform_snapshot.fields.get(platform_field).cloned();
            let a = authority_snapshot.fields.get(authority_field).cloned();
            if p != a {
                field_diffs.push(FieldDiff::new(
                    platform_field.to_string(),
                    p.unwrap_or(json!(null)),
                    a.unwrap_or(json!(null)),
                ));
            }
        }
        let conflict = self
            .detector
            .detect(
                tenant.id,
                resource_type,
                &record.platform_id,
                Some(authority_snapshot.id.clone()),
                Divergence::Creation { field_diffs },
                job_id,
            )
            .await?;
        record.mark_pending();
        self.stores.records.upsert(record).await?;
        Ok(ReconcileReport {
            outcome: UnitOutcome::Skipped,
            conflicts: vec![conflict],
        })
    }

    /// One side reports the entity deleted, the other says active.
    async fn reconcile_deletion(
        &self,
        tenant: &Tenant,
        resource_type: ResourceType,
        mut record: CatalogRecord,
        platform_snapshot: &ResourceSnapshot,
        authority_snapshot: &ResourceSnapshot,
        job_id: Option<JobId>,
    ) -> EngineResult<ReconcileReport> {
        if platform_snapshot.deleted && authority_snapshot.deleted {
            record.mark_deleted();
            record.mark_synced();
            self.stores.records.upsert(record).await?;
            return Ok(ReconcileReport::synced());
        }

        let divergence = Divergence::Deletion {
            platform_deleted: platform_snapshot.deleted,
            field_diffs: vec![FieldDiff::new(
                "state",
                json!(if platform_snapshot.deleted { "deleted" } else { "active" }),
                json!(if authority_snapshot.deleted { "deleted" } else { "active" }),
            )],
        };
        let conflict = self
            .detector
            .detect(
                tenant.id,
                resource_type,
                &record.platform_id,
                record.authority_id.clone(),
                divergence,
                job_id,
            )
            .await?;

        match self
            .detector
            .auto_resolve(tenant.id, conflict.id, tenant.resolution_policy)
            .await?
        {
            AutoResolveOutcome::Resolved(resolution) => {
                let winner_deleted = match resolution {
                    ConflictResolution::UsePlatform => platform_snapshot.deleted,
                    ConflictResolution::UseAuthority => authority_snapshot.deleted,
                    // Auto resolution always picks a side.
                    ConflictResolution::KeepBoth => false,
                };
                if winner_deleted {
                    record.mark_deleted();
                } else {
                    record.state = RecordState::Active;
                }
                record.mark_synced();
                self.stores.records.upsert(record).await?;
                let resolved = self
                    .stores
                    .conflicts
                    .get(tenant.id, conflict.id)
                    .await
                    .map(|c| vec![c])
                    .unwrap_or_default();
                Ok(ReconcileReport {
                    outcome: UnitOutcome::Synced,
                    conflicts: resolved,
                })
            }
            AutoResolveOutcome::Unresolved => {
                record.mark_pending();
                self.stores.records.upsert(record).await?;
                Ok(ReconcileReport {
                    outcome: UnitOutcome::Skipped,
                    conflicts: vec![conflict],
                })
            }
        }
    }

    /// Inventory reconciles separately from core fields. Platform levels
    /// are applied to the ledger; any platform/authority quantity mismatch
    /// always raises an `inventory_conflict` rather than silently picking
    /// a value, because overselling is a safety problem.
    async fn reconcile_inventory(
        &self,
        tenant: &Tenant,
        variant_id: &str,
        ctx: &UnitContext,
    ) -> EngineResult<ReconcileReport> {
        let platform_levels = self
            .platform
            .fetch_inventory(tenant.id, variant_id)
            .await?
            .map(|s| s.levels)
            .unwrap_or_default();
        let authority_levels = self
            .authority
            .fetch_inventory(tenant.id, variant_id)
            .await?
            .map(|s| s.levels)
            .unwrap_or_default();

        for (location_id, qty) in &platform_levels {
            self.stores
                .inventory
                .apply_level(
                    tenant.id,
                    variant_id,
                    location_id,
                    *qty,
                    ctx.stock_source,
                    None,
                )
                .await?;
        }

        let mut field_diffs = Vec::new();
        for (location_id, platform_qty) in &platform_levels {
            if let Some(authority_qty) = authority_levels.get(location_id) {
                if platform_qty != authority_qty {
                    field_diffs.push(FieldDiff::new(
                        location_id.clone(),
                        json!(platform_qty),
                        json!(authority_qty),
                    ));
                }
            }
        }

        if field_diffs.is_empty() {
            self.stores
                .inventory
                .update(tenant.id, variant_id, |r| {
                    r.sync_status = shopsync_core::SyncStatus::Synced;
                    r.last_synced_at = Some(chrono::Utc::now());
                    Ok(())
                })
                .await
                .ok();
            return Ok(ReconcileReport::synced());
        }

        let conflict = self
            .detector
            .detect(
                tenant.id,
                ResourceType::Inventory,
                variant_id,
                None,
                Divergence::Inventory { field_diffs },
                ctx.job_id,
            )
            .await?;
        self.stores
            .inventory
            .update(tenant.id, variant_id, |r| {
                r.sync_status = shopsync_core::SyncStatus::Pending;
                Ok(())
            })
            .await
            .ok();
        Ok(ReconcileReport {
            outcome: UnitOutcome::Skipped,
            conflicts: vec![conflict],
        })
    }
}

/// Take the mapped image field out of the merge when the job did not opt
/// in. Treated like an accepted divergence so each side keeps its own
/// images untouched.
fn exclude_images(
    outcome: &mut MergeOutcome,
    platform: &ResourceSnapshot,
    authority: &ResourceSnapshot,
    mapping: &FieldMapping,
) {
    let Some(authority_field) = mapping.authority_field("images") else {
        return;
    };
    outcome.merged.remove("images");
    outcome.conflicts.retain(|d| d.field != "images");
    outcome.accepted.retain(|d| d.field != "images");
    outcome.accepted.push(FieldDiff::new(
        "images",
        platform.fields.get("images").cloned().unwrap_or(json!(null)),
        authority
            .fields
            .get(authority_field)
            .cloned()
            .unwrap_or(json!(null)),
    ));
}

/// Decide the remaining two-sided divergences by direction when the job
/// runs with the force flag. Inventory is never forced.
fn force_merge(
    outcome: &mut MergeOutcome,
    platform: &ResourceSnapshot,
    authority: &ResourceSnapshot,
    direction: SyncDirection,
) {
    let platform_wins = match direction {
        SyncDirection::PlatformToAuthority => true,
        SyncDirection::AuthorityToPlatform => false,
        SyncDirection::Bidirectional => platform.updated_at >= authority.updated_at,
    };
    for diff in outcome.conflicts.drain(..) {
        let value = if platform_wins {
            diff.platform_value
        } else {
            diff.authority_value
        };
        outcome.merged.insert(diff.field, value);
    }
}
