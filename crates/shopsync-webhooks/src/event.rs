//! Strongly-typed webhook events over the fixed topic set.
//!
//! Payloads are a tagged union keyed by topic; unknown topics are
//! rejected, not silently ignored.

use serde::{Deserialize, Serialize};

use shopsync_core::ResourceType;
use shopsync_store::ResourceTarget;

use crate::error::{WebhookError, WebhookResult};

/// Product create/update/delete payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPayload {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Collection create/update/delete payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionPayload {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// Inventory level change payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLevelPayload {
    pub variant_id: String,
    pub location_id: String,
    pub available: i64,
}

/// App uninstall payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UninstallPayload {
    #[serde(default)]
    pub shop_domain: Option<String>,
}

/// One normalized webhook event.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    ProductCreated(ProductPayload),
    ProductUpdated(ProductPayload),
    ProductDeleted(ProductPayload),
    CollectionCreated(CollectionPayload),
    CollectionUpdated(CollectionPayload),
    CollectionDeleted(CollectionPayload),
    InventoryLevelUpdated(InventoryLevelPayload),
    AppUninstalled(UninstallPayload),
}

impl WebhookEvent {
    /// Parse a raw body under a topic. Unknown topics and malformed
    /// payloads are rejected.
    pub fn parse(topic: &str, body: &[u8]) -> WebhookResult<Self> {
        fn payload<T: serde::de::DeserializeOwned>(body: &[u8]) -> WebhookResult<T> {
            serde_json::from_slice(body).map_err(|e| WebhookError::Payload(e.to_string()))
        }

        match topic {
            "products/create" => Ok(Self::ProductCreated(payload(body)?)),
            "products/update" => Ok(Self::ProductUpdated(payload(body)?)),
            "products/delete" => Ok(Self::ProductDeleted(payload(body)?)),
            "collections/create" => Ok(Self::CollectionCreated(payload(body)?)),
            "collections/update" => Ok(Self::CollectionUpdated(payload(body)?)),
            "collections/delete" => Ok(Self::CollectionDeleted(payload(body)?)),
            "inventory_levels/update" => Ok(Self::InventoryLevelUpdated(payload(body)?)),
            "app/uninstalled" => Ok(Self::AppUninstalled(payload(body)?)),
            other => Err(WebhookError::UnknownTopic(other.to_string())),
        }
    }

    /// The topic string this event arrived under.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        match self {
            Self::ProductCreated(_) => "products/create",
            Self::ProductUpdated(_) => "products/update",
            Self::ProductDeleted(_) => "products/delete",
            Self::CollectionCreated(_) => "collections/create",
            Self::CollectionUpdated(_) => "collections/update",
            Self::CollectionDeleted(_) => "collections/delete",
            Self::InventoryLevelUpdated(_) => "inventory_levels/update",
            Self::AppUninstalled(_) => "app/uninstalled",
        }
    }

    /// The platform resource id this event concerns.
    #[must_use]
    pub fn resource_id(&self) -> &str {
        match self {
            Self::ProductCreated(p) | Self::ProductUpdated(p) | Self::ProductDeleted(p) => &p.id,
            Self::CollectionCreated(c) | Self::CollectionUpdated(c) | Self::CollectionDeleted(c) => {
                &c.id
            }
            Self::InventoryLevelUpdated(i) => &i.variant_id,
            Self::AppUninstalled(_) => "",
        }
    }

    /// The sync target this event maps to. Uninstalls are not catalog
    /// work and map to none.
    #[must_use]
    pub fn target(&self) -> Option<ResourceTarget> {
        match self {
            Self::ProductCreated(p) | Self::ProductUpdated(p) | Self::ProductDeleted(p) => {
                Some(ResourceTarget::new(ResourceType::Product, &p.id))
            }
            Self::CollectionCreated(c) | Self::CollectionUpdated(c) | Self::CollectionDeleted(c) => {
                Some(ResourceTarget::new(ResourceType::Collection, &c.id))
            }
            Self::InventoryLevelUpdated(i) => {
                Some(ResourceTarget::new(ResourceType::Inventory, &i.variant_id))
            }
            Self::AppUninstalled(_) => None,
        }
    }
}
