//! In-memory API registry with change notifications.
//!
//! [`InMemoryApiRegistry`] is the single-node stand-in for the replicated
//! registry: a keyed store of [`ApiDefinition`]s that publishes one
//! [`RegistryEvent`] per mutation on a broadcast channel. Any number of
//! listeners can subscribe; [`spawn_listener`] drives a
//! [`RegistryListener`] from one subscription.

use parking_lot::RwLock;
use portico_kernel::gateway::{ApiDefinition, GatewayError, RegistryEvent, RegistryListener};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

const EVENT_BUFFER: usize = 1024;

/// Keyed store of API definitions that broadcasts every mutation.
pub struct InMemoryApiRegistry {
    apis: RwLock<HashMap<String, ApiDefinition>>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Default for InMemoryApiRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryApiRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            apis: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Subscribe to every mutation made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Insert or replace a definition and publish [`RegistryEvent::Upserted`].
    ///
    /// Events are sent while the write guard is held, so listeners observe
    /// mutations in the order they were applied to the store.
    pub fn put(&self, api: ApiDefinition) -> Result<(), GatewayError> {
        api.validate()?;
        let mut apis = self.apis.write();
        apis.insert(api.id.clone(), api.clone());
        self.publish(RegistryEvent::Upserted(api));
        Ok(())
    }

    /// Delete a definition and publish [`RegistryEvent::Removed`] with its
    /// last stored value. Returns `None` when the id was unknown.
    pub fn delete(&self, id: &str) -> Option<ApiDefinition> {
        let mut apis = self.apis.write();
        let removed = apis.remove(id)?;
        self.publish(RegistryEvent::Removed(removed.clone()));
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<ApiDefinition> {
        self.apis.read().get(id).cloned()
    }

    /// All definitions, sorted by id.
    pub fn list(&self) -> Vec<ApiDefinition> {
        let mut all: Vec<_> = self.apis.read().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    fn publish(&self, event: RegistryEvent) {
        // No subscribers is fine: nothing is listening yet.
        if self.events.send(event).is_err() {
            debug!("registry event published with no subscribers");
        }
    }
}

/// Feed every event from `events` to `listener` until the registry is dropped.
///
/// Events are handled one at a time in arrival order. A lagging subscriber
/// loses events; that is logged and the loop continues with the next one.
pub fn spawn_listener<L>(
    listener: Arc<L>,
    mut events: broadcast::Receiver<RegistryEvent>,
) -> JoinHandle<()>
where
    L: RegistryListener + 'static,
{
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    listener.on_event(event).await;
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    error!(missed, "registry listener lagged, notifications were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("registry closed, listener exiting");
                    break;
                }
            }
        }
    })
}
