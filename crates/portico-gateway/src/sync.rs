//! Registry-to-route-table reconciliation.
//!
//! [`RegistrySync`] reacts to registry notifications by tearing down every
//! route a definition could have produced and then registering the routes it
//! produces now. No lock is taken: notifications for the same API may be
//! processed concurrently on this node and on other nodes, and the
//! teardown-before-add sequence is what keeps route ids unique.
//!
//! ```text
//! upserted(api)
//!   ├─ teardown(previously installed ∪ route ids of api.paths)
//!   ├─ Direct(paths)        ──────────────────────────────► add_routes(paths)
//!   └─ Descriptor(endpoint) ─► resolve ─► teardown(resolved) ─► add_routes(resolved)
//!
//! removed(api)
//!   └─ teardown(previously installed ∪ route ids of api.paths), drop running state
//! ```
//!
//! Nothing here ever fails the notification. Every per-route failure is
//! logged and collected in the returned [`SyncReport`].

use async_trait::async_trait;
use dashmap::DashMap;
use portico_kernel::gateway::{
    ApiDefinition, DescriptorResolver, GatewayError, RegistryListener, RouteBatch, RouteEngine,
    RouteId, RouteSource, RouteStrategy, RunningApiStore, route_id,
};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Reports
// ─────────────────────────────────────────────────────────────────────────────

/// Step of the reconciliation sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Stop,
    Remove,
    Resolve,
    Add,
}

impl fmt::Display for SyncStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStage::Stop => "stop",
            SyncStage::Remove => "remove",
            SyncStage::Resolve => "resolve",
            SyncStage::Add => "add",
        };
        f.write_str(name)
    }
}

/// One failed step. `route_id` is `None` for steps that concern the whole
/// API (descriptor resolution, batch add).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub stage: SyncStage,
    pub route_id: Option<RouteId>,
    pub error: GatewayError,
}

/// Outcome of handling one registry notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub api_id: String,
    /// Routes that were live and got torn down.
    pub removed: Vec<RouteId>,
    /// Routes registered by this notification.
    pub added: Vec<RouteId>,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    fn new(api_id: &str) -> Self {
        Self {
            api_id: api_id.to_string(),
            ..Default::default()
        }
    }

    /// `true` when every step succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, stage: SyncStage, route_id: Option<RouteId>, err: GatewayError) {
        error!(
            api_id = %self.api_id,
            stage = %stage,
            route_id = route_id.as_ref().map(RouteId::as_str).unwrap_or("-"),
            error = %err,
            "route reconciliation step failed"
        );
        self.failures.push(SyncFailure {
            stage,
            route_id,
            error: err,
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RegistrySync
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps the route engine consistent with the API registry.
pub struct RegistrySync {
    engine: Arc<dyn RouteEngine>,
    resolver: Arc<dyn DescriptorResolver>,
    running: Arc<dyn RunningApiStore>,
    /// Route ids this node last registered per API id. Lets an update drop
    /// paths that vanished from the definition.
    installed: DashMap<String, Vec<RouteId>>,
}

impl RegistrySync {
    pub fn new(
        engine: Arc<dyn RouteEngine>,
        resolver: Arc<dyn DescriptorResolver>,
        running: Arc<dyn RunningApiStore>,
    ) -> Self {
        Self {
            engine,
            resolver,
            running,
            installed: DashMap::new(),
        }
    }

    /// Route ids this node currently believes it registered for `api_id`.
    pub fn installed_routes(&self, api_id: &str) -> Vec<RouteId> {
        self.installed
            .get(api_id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default()
    }

    /// Route ids implied by the stored paths of `api`, plus those this node
    /// installed for it earlier.
    fn known_route_ids(&self, api: &ApiDefinition) -> BTreeSet<RouteId> {
        let mut ids: BTreeSet<RouteId> =
            api.paths().iter().map(|p| route_id(&api.id, p)).collect();
        ids.extend(self.installed_routes(&api.id));
        ids
    }

    /// Stop then remove every live route in `ids`. A failure on one route
    /// never prevents the others from being processed.
    fn teardown(&self, ids: impl IntoIterator<Item = RouteId>, report: &mut SyncReport) {
        for id in ids {
            if !self.engine.route_exists(&id) {
                continue;
            }
            if let Err(err) = self.engine.stop_route(&id) {
                report.fail(SyncStage::Stop, Some(id), err);
                continue;
            }
            match self.engine.remove_route(&id) {
                Ok(()) => report.removed.push(id),
                Err(err) => report.fail(SyncStage::Remove, Some(id), err),
            }
        }
    }
}

#[async_trait]
impl RegistryListener for RegistrySync {
    type Report = SyncReport;

    async fn on_upserted(&self, api: ApiDefinition) -> SyncReport {
        info!(api_id = %api.id, "API upserted, deploying routes");
        let mut report = SyncReport::new(&api.id);
        let mut api = api;

        let stale = self.known_route_ids(&api);
        self.teardown(stale, &mut report);

        let descriptor = match api.route_source() {
            RouteSource::Direct(_) => None,
            RouteSource::Descriptor(endpoint) => Some(endpoint.to_string()),
        };
        let strategy = match descriptor {
            None => RouteStrategy::Direct,
            Some(endpoint) => {
                match self.resolver.resolve(&endpoint).await {
                    Ok(resolved) => {
                        // The descriptor may yield paths nobody declared.
                        let resolved_ids = resolved.iter().map(|p| route_id(&api.id, p));
                        self.teardown(resolved_ids.collect::<Vec<_>>(), &mut report);
                        api.replace_paths(resolved);
                        RouteStrategy::Descriptor
                    }
                    Err(err) => {
                        report.fail(SyncStage::Resolve, None, err);
                        self.installed.remove(&api.id);
                        return report;
                    }
                }
            }
        };

        let batch = RouteBatch::for_api(&api, strategy);
        if batch.is_empty() {
            warn!(api_id = %api.id, "API declares no paths, nothing to deploy");
            self.installed.remove(&api.id);
            return report;
        }

        let ids = batch.route_ids();
        match self.engine.add_routes(batch) {
            Ok(()) => {
                self.installed.insert(api.id.clone(), ids.clone());
                report.added = ids;
            }
            Err(err) => {
                self.installed.remove(&api.id);
                report.fail(SyncStage::Add, None, err);
            }
        }

        info!(
            api_id = %api.id,
            removed = report.removed.len(),
            added = report.added.len(),
            failures = report.failures.len(),
            "API deployment finished"
        );
        report
    }

    async fn on_removed(&self, api: ApiDefinition) -> SyncReport {
        info!(api_id = %api.id, "API deleted, undeploying routes");
        let mut report = SyncReport::new(&api.id);

        let ids = self.known_route_ids(&api);
        self.teardown(ids.iter().cloned(), &mut report);
        self.installed.remove(&api.id);
        for id in &ids {
            self.running.remove(id.as_str());
        }

        info!(
            api_id = %api.id,
            removed = report.removed.len(),
            failures = report.failures.len(),
            "API undeployment finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryRouteEngine;
    use crate::running::InMemoryRunningApiStore;
    use parking_lot::Mutex;
    use portico_kernel::gateway::{HttpMethod, PathSpec};

    /// Resolver returning a fixed path list, or failing when empty.
    struct StaticResolver(Mutex<Option<Vec<PathSpec>>>);

    #[async_trait]
    impl DescriptorResolver for StaticResolver {
        async fn resolve(&self, endpoint: &str) -> Result<Vec<PathSpec>, GatewayError> {
            self.0.lock().clone().ok_or_else(|| {
                GatewayError::DescriptorUnavailable(endpoint.to_string(), "down".to_string())
            })
        }
    }

    /// Engine whose `remove_route` fails for one route id.
    struct FlakyEngine {
        inner: InMemoryRouteEngine,
        poisoned: RouteId,
    }

    impl RouteEngine for FlakyEngine {
        fn route_exists(&self, id: &RouteId) -> bool {
            self.inner.route_exists(id)
        }
        fn stop_route(&self, id: &RouteId) -> Result<(), GatewayError> {
            self.inner.stop_route(id)
        }
        fn remove_route(&self, id: &RouteId) -> Result<(), GatewayError> {
            if *id == self.poisoned {
                return Err(GatewayError::Store("engine busy".to_string()));
            }
            self.inner.remove_route(id)
        }
        fn add_routes(&self, batch: RouteBatch) -> Result<(), GatewayError> {
            self.inner.add_routes(batch)
        }
    }

    struct Fixture {
        engine: Arc<InMemoryRouteEngine>,
        running: Arc<InMemoryRunningApiStore>,
        sync: RegistrySync,
    }

    fn fixture(resolved: Option<Vec<PathSpec>>) -> Fixture {
        let engine = Arc::new(InMemoryRouteEngine::new());
        let running = Arc::new(InMemoryRunningApiStore::new());
        let sync = RegistrySync::new(
            engine.clone(),
            Arc::new(StaticResolver(Mutex::new(resolved))),
            running.clone(),
        );
        Fixture {
            engine,
            running,
            sync,
        }
    }

    fn orders() -> ApiDefinition {
        ApiDefinition::new("orders", "http://orders")
            .with_path(PathSpec::new(HttpMethod::Get, "/orders"))
            .with_path(PathSpec::new(HttpMethod::Post, "/orders"))
            .with_path(PathSpec::new(HttpMethod::Get, "/orders/{id}"))
    }

    fn live_ids(engine: &InMemoryRouteEngine) -> BTreeSet<String> {
        engine.routes().into_iter().map(|r| r.id.to_string()).collect()
    }

    #[tokio::test]
    async fn upsert_registers_one_route_per_path() {
        let f = fixture(None);
        let report = f.sync.on_upserted(orders()).await;
        assert!(report.is_clean());
        assert_eq!(report.added.len(), 3);
        assert_eq!(f.engine.len(), 3);
    }

    #[tokio::test]
    async fn repeated_upsert_is_idempotent() {
        let f = fixture(None);
        f.sync.on_upserted(orders()).await;
        let once = live_ids(&f.engine);
        let report = f.sync.on_upserted(orders()).await;
        assert!(report.is_clean());
        assert_eq!(report.removed.len(), 3);
        assert_eq!(live_ids(&f.engine), once);
    }

    #[tokio::test]
    async fn upsert_replaces_route_registered_elsewhere() {
        let f = fixture(None);
        // A route with the same id left behind by another node or version.
        let mut stale = ApiDefinition::new("orders", "http://old-orders");
        stale.replace_paths(vec![PathSpec::new(HttpMethod::Get, "/orders")]);
        f.engine
            .add_routes(RouteBatch::for_api(&stale, RouteStrategy::Direct))
            .unwrap();

        let report = f.sync.on_upserted(orders()).await;
        assert!(report.is_clean());
        let m = f.engine.resolve("/orders", &HttpMethod::Get).unwrap();
        assert_eq!(m.upstream, "http://orders");
    }

    #[tokio::test]
    async fn update_drops_paths_removed_from_definition() {
        let f = fixture(None);
        f.sync.on_upserted(orders()).await;
        let narrowed = ApiDefinition::new("orders", "http://orders")
            .with_path(PathSpec::new(HttpMethod::Get, "/orders"));
        f.sync.on_upserted(narrowed).await;
        assert_eq!(
            live_ids(&f.engine),
            BTreeSet::from(["orders:GET:/orders".to_string()])
        );
    }

    #[tokio::test]
    async fn remove_tears_down_every_route() {
        let f = fixture(None);
        f.sync.on_upserted(orders()).await;
        let report = f.sync.on_removed(orders()).await;
        assert!(report.is_clean());
        assert_eq!(report.removed.len(), 3);
        assert!(f.engine.is_empty());
        assert!(f.sync.installed_routes("orders").is_empty());
    }

    #[tokio::test]
    async fn remove_of_never_deployed_api_is_a_no_op() {
        let f = fixture(None);
        let report = f.sync.on_removed(orders()).await;
        assert!(report.is_clean());
        assert!(report.removed.is_empty());
    }

    #[tokio::test]
    async fn remove_clears_running_state() {
        let f = fixture(None);
        f.sync.on_upserted(orders()).await;
        f.running
            .upsert("orders:GET:/orders", &|api| api.blocked = true)
            .unwrap();
        f.sync.on_removed(orders()).await;
        assert!(f.running.list().is_empty());
    }

    #[tokio::test]
    async fn descriptor_paths_replace_declared_paths() {
        let f = fixture(Some(vec![
            PathSpec::new(HttpMethod::Get, "/pets"),
            PathSpec::new(HttpMethod::Delete, "/pets/{id}"),
        ]));
        let api = ApiDefinition::new("pets", "http://pets")
            .with_path(PathSpec::new(HttpMethod::Get, "/legacy"))
            .with_descriptor("http://pets/openapi.json");

        let report = f.sync.on_upserted(api).await;
        assert!(report.is_clean());
        assert_eq!(
            live_ids(&f.engine),
            BTreeSet::from([
                "pets:GET:/pets".to_string(),
                "pets:DELETE:/pets/{id}".to_string(),
            ])
        );
    }

    #[tokio::test]
    async fn descriptor_only_path_live_elsewhere_is_replaced() {
        let f = fixture(Some(vec![PathSpec::new(HttpMethod::Get, "/pets")]));
        // Registered by another node: not declared inline, not installed here.
        let mut elsewhere = ApiDefinition::new("pets", "http://old-pets");
        elsewhere.replace_paths(vec![PathSpec::new(HttpMethod::Get, "/pets")]);
        f.engine
            .add_routes(RouteBatch::for_api(&elsewhere, RouteStrategy::Direct))
            .unwrap();
        assert!(f.sync.installed_routes("pets").is_empty());

        let api = ApiDefinition::new("pets", "http://pets")
            .with_path(PathSpec::new(HttpMethod::Get, "/legacy"))
            .with_descriptor("http://pets/openapi.json");
        let report = f.sync.on_upserted(api).await;

        assert!(report.is_clean());
        assert_eq!(report.removed, vec![RouteId::from_raw("pets:GET:/pets")]);
        let m = f.engine.resolve("/pets", &HttpMethod::Get).unwrap();
        assert_eq!(m.upstream, "http://pets");
    }

    #[tokio::test]
    async fn descriptor_failure_leaves_no_routes() {
        let f = fixture(None);
        let api = ApiDefinition::new("pets", "http://pets")
            .with_path(PathSpec::new(HttpMethod::Get, "/pets"))
            .with_descriptor("http://pets/openapi.json");

        let report = f.sync.on_upserted(api).await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, SyncStage::Resolve);
        assert!(f.engine.is_empty());
    }

    #[tokio::test]
    async fn removal_failure_does_not_stop_other_paths() {
        let inner = InMemoryRouteEngine::new();
        inner
            .add_routes(RouteBatch::for_api(&orders(), RouteStrategy::Direct))
            .unwrap();
        let engine = Arc::new(FlakyEngine {
            inner,
            poisoned: RouteId::from_raw("orders:POST:/orders"),
        });
        let sync = RegistrySync::new(
            engine.clone(),
            Arc::new(StaticResolver(Mutex::new(None))),
            Arc::new(InMemoryRunningApiStore::new()),
        );

        let report = sync.on_removed(orders()).await;
        assert_eq!(report.removed.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, SyncStage::Remove);
        assert_eq!(
            report.failures[0].route_id,
            Some(RouteId::from_raw("orders:POST:/orders"))
        );
    }

    #[tokio::test]
    async fn add_failure_is_reported_not_raised() {
        let f = fixture(None);
        let dup = ApiDefinition::new("orders", "http://orders")
            .with_path(PathSpec::new(HttpMethod::Get, "/orders"))
            .with_path(PathSpec::new(HttpMethod::Get, "/orders/"));
        let report = f.sync.on_upserted(dup).await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, SyncStage::Add);
        assert!(f.engine.is_empty());
    }
}
