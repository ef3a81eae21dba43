//! In-memory [`RunningApiStore`] implementation.

use dashmap::DashMap;
use portico_kernel::gateway::{GatewayError, RunningApi, RunningApiStore};

/// [`RunningApiStore`] backed by a sharded concurrent map.
///
/// Updates hold the shard lock of a single key, which makes each
/// [`upsert`](RunningApiStore::upsert) atomic per route id without any
/// cross-key coordination.
#[derive(Default)]
pub struct InMemoryRunningApiStore {
    entries: DashMap<String, RunningApi>,
}

impl InMemoryRunningApiStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RunningApiStore for InMemoryRunningApiStore {
    fn get(&self, route_id: &str) -> RunningApi {
        self.entries
            .entry(route_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    fn upsert(
        &self,
        route_id: &str,
        update: &dyn Fn(&mut RunningApi),
    ) -> Result<RunningApi, GatewayError> {
        let mut entry = self.entries.entry(route_id.to_string()).or_default();
        update(entry.value_mut());
        Ok(entry.value().clone())
    }

    fn remove(&self, route_id: &str) {
        self.entries.remove(route_id);
    }

    fn list(&self) -> Vec<(String, RunningApi)> {
        let mut all: Vec<_> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn get_creates_default_record() {
        let store = InMemoryRunningApiStore::new();
        assert_eq!(store.get("r1"), RunningApi::default());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn upsert_applies_update() {
        let store = InMemoryRunningApiStore::new();
        let updated = store
            .upsert("r1", &|api| api.suspension_message = Some("maintenance".into()))
            .unwrap();
        assert_eq!(updated.suspension_message.as_deref(), Some("maintenance"));
        assert!(!store.get("r1").blocked);
    }

    #[test]
    fn remove_drops_record() {
        let store = InMemoryRunningApiStore::new();
        store.upsert("r1", &|api| api.blocked = true).unwrap();
        store.remove("r1");
        assert!(!store.get("r1").blocked);
    }

    #[test]
    fn concurrent_upserts_on_one_key_are_not_lost() {
        let store = Arc::new(InMemoryRunningApiStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store
                            .upsert("r1", &|api| {
                                let n: usize = api
                                    .suspension_message
                                    .as_deref()
                                    .and_then(|m| m.parse().ok())
                                    .unwrap_or(0);
                                api.suspension_message = Some((n + 1).to_string());
                                api.blocked = i % 2 == 0 || api.blocked;
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.get("r1").suspension_message.as_deref(), Some("800"));
        assert!(store.get("r1").blocked);
    }
}
