//! Webhook ingestion adapter.
//!
//! Verifies the delivery signature against the tenant's shared secret,
//! parses the payload into a typed event, suppresses replays, and turns
//! surviving events into platform-to-authority sync jobs.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use shopsync_core::{SyncDirection, TenantId};
use shopsync_engine::Orchestrator;
use shopsync_store::{JobKind, JobOptions, SyncJob, TenantStore};

use crate::crypto::{payload_checksum, verify_signature};
use crate::dedup::DedupCache;
use crate::error::{WebhookError, WebhookResult};
use crate::event::WebhookEvent;

/// What happened to one delivery.
#[derive(Debug)]
pub enum IngestOutcome {
    /// A sync job was enqueued for the event's target.
    Accepted(SyncJob),
    /// An identical delivery was already seen inside the replay window.
    Duplicate,
    /// An uninstall event deactivated the tenant; no job was created.
    TenantDeactivated,
}

/// Turns verified webhook deliveries into sync jobs.
pub struct WebhookAdapter {
    tenants: Arc<TenantStore>,
    orchestrator: Arc<Orchestrator>,
    dedup: DedupCache,
}

impl WebhookAdapter {
    #[must_use]
    pub fn new(tenants: Arc<TenantStore>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            tenants,
            orchestrator,
            dedup: DedupCache::default(),
        }
    }

    /// Processes one raw delivery. The signature is checked before the
    /// body is parsed; an unverified payload never reaches the parser.
    #[instrument(skip(self, signature, body), fields(tenant_id = %tenant_id, topic = %topic))]
    pub async fn receive(
        &self,
        tenant_id: TenantId,
        topic: &str,
        signature: &str,
        body: &[u8],
    ) -> WebhookResult<IngestOutcome> {
        let tenant = self
            .tenants
            .get(tenant_id)
            .await
            .map_err(|_| WebhookError::TenantUnavailable(tenant_id.to_string()))?;

        if !verify_signature(signature, &tenant.webhook_secret, body) {
            warn!(tenant_id = %tenant_id, topic = %topic, "Webhook signature mismatch");
            return Err(WebhookError::InvalidSignature);
        }

        let event = WebhookEvent::parse(topic, body)?;

        if let WebhookEvent::AppUninstalled(_) = event {
            self.tenants.deactivate(tenant_id).await?;
            info!(tenant_id = %tenant_id, "Tenant deactivated by uninstall webhook");
            return Ok(IngestOutcome::TenantDeactivated);
        }

        let checksum = payload_checksum(body);
        if self
            .dedup
            .check_and_insert(tenant_id, event.topic(), event.resource_id(), &checksum)
        {
            info!(
                tenant_id = %tenant_id,
                topic = %topic,
                resource_id = %event.resource_id(),
                "Duplicate webhook delivery suppressed"
            );
            return Ok(IngestOutcome::Duplicate);
        }

        let target = event
            .target()
            .ok_or_else(|| WebhookError::UnknownTopic(topic.to_string()))?;

        let job = self
            .orchestrator
            .enqueue(
                tenant_id,
                JobKind::WebhookTriggered,
                SyncDirection::PlatformToAuthority,
                vec![target],
                JobOptions::default(),
            )
            .await?;

        info!(
            tenant_id = %tenant_id,
            job_id = %job.id,
            topic = %topic,
            resource_id = %event.resource_id(),
            "Webhook delivery enqueued"
        );
        Ok(IngestOutcome::Accepted(job))
    }
}
