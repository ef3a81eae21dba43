//! Registry change notifications.
//!
//! The shared API registry pushes one [`RegistryEvent`] per mutation. Delivery
//! is at-least-once and unordered across keys, so listeners must be
//! idempotent.

use super::api::ApiDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A registry mutation, carrying the full definition (never a diff).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "api", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// The definition was added or replaced.
    Upserted(ApiDefinition),
    /// The definition was deleted; carries the last stored value.
    Removed(ApiDefinition),
}

impl RegistryEvent {
    pub fn api(&self) -> &ApiDefinition {
        match self {
            RegistryEvent::Upserted(api) | RegistryEvent::Removed(api) => api,
        }
    }
}

/// Observer subscribed to registry notifications.
///
/// Both hooks may run concurrently, for the same or different API ids, and
/// must never fail the notification.
#[async_trait]
pub trait RegistryListener: Send + Sync {
    /// Report produced by each hook, for logs and tests.
    type Report: Send;

    async fn on_upserted(&self, api: ApiDefinition) -> Self::Report;

    async fn on_removed(&self, api: ApiDefinition) -> Self::Report;

    /// Dispatch a single event to the matching hook.
    async fn on_event(&self, event: RegistryEvent) -> Self::Report {
        match event {
            RegistryEvent::Upserted(api) => self.on_upserted(api).await,
            RegistryEvent::Removed(api) => self.on_removed(api).await,
        }
    }
}
