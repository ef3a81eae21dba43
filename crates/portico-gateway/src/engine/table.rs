//! In-memory [`RouteEngine`] with request-time path resolution.
//!
//! Routes are stored in descending priority order. Resolution performs a
//! linear scan with a path-template matcher that supports `{param}` capture
//! groups. Route tables are small, so O(R × D) per lookup is fine and
//! trivially correct to verify.

use parking_lot::RwLock;
use portico_kernel::gateway::{
    GatewayError, HttpMethod, RouteBatch, RouteDefinition, RouteEngine, RouteId, RouteMatch,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

struct RouteEntry {
    definition: RouteDefinition,
    /// Stopped routes stay registered but never match.
    running: bool,
}

/// [`RouteEngine`] backed by a priority-sorted route list.
#[derive(Default)]
pub struct InMemoryRouteEngine {
    routes: RwLock<Vec<RouteEntry>>,
}

impl InMemoryRouteEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match a concrete path against a template such as `/orders/{id}`.
    ///
    /// Returns `Some(params)` when the template matches, where `params` maps
    /// capture names to their extracted values.
    fn match_path(template: &str, path: &str) -> Option<HashMap<String, String>> {
        let t_parts: Vec<&str> = template.trim_matches('/').split('/').collect();
        let p_parts: Vec<&str> = path.trim_matches('/').split('/').collect();

        if t_parts.len() != p_parts.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (t, p) in t_parts.iter().zip(p_parts.iter()) {
            if let Some(name) = t.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
                if p.is_empty() {
                    return None;
                }
                params.insert(name.to_string(), p.to_string());
            } else if *t != *p {
                return None;
            }
        }
        Some(params)
    }

    /// Resolve a call `(path, method)` to the best matching running route.
    pub fn resolve(&self, path: &str, method: &HttpMethod) -> Option<RouteMatch> {
        let routes = self.routes.read();
        routes
            .iter()
            .filter(|entry| entry.running && entry.definition.path.method == *method)
            .find_map(|entry| {
                let def = &entry.definition;
                Self::match_path(&def.path.uri, path).map(|path_params| RouteMatch {
                    route_id: def.id.to_string(),
                    api_id: def.api_id.clone(),
                    upstream: def.upstream.clone(),
                    path_params,
                    throttling: def.path.throttling,
                })
            })
    }

    /// Definition of a registered route, running or not.
    pub fn definition(&self, id: &RouteId) -> Option<RouteDefinition> {
        self.routes
            .read()
            .iter()
            .find(|entry| entry.definition.id == *id)
            .map(|entry| entry.definition.clone())
    }

    /// Snapshot of all registered routes, sorted by descending priority.
    pub fn routes(&self) -> Vec<RouteDefinition> {
        self.routes
            .read()
            .iter()
            .map(|entry| entry.definition.clone())
            .collect()
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }
}

impl RouteEngine for InMemoryRouteEngine {
    fn route_exists(&self, id: &RouteId) -> bool {
        self.routes.read().iter().any(|entry| entry.definition.id == *id)
    }

    fn stop_route(&self, id: &RouteId) -> Result<(), GatewayError> {
        let mut routes = self.routes.write();
        if let Some(entry) = routes.iter_mut().find(|entry| entry.definition.id == *id) {
            entry.running = false;
            debug!(route_id = %id, "route stopped");
        }
        Ok(())
    }

    fn remove_route(&self, id: &RouteId) -> Result<(), GatewayError> {
        let mut routes = self.routes.write();
        let before = routes.len();
        routes.retain(|entry| entry.definition.id != *id);
        if routes.len() != before {
            debug!(route_id = %id, "route removed");
        }
        Ok(())
    }

    fn add_routes(&self, batch: RouteBatch) -> Result<(), GatewayError> {
        let mut routes = self.routes.write();

        // Validate the whole batch before touching the table.
        let mut seen = HashSet::new();
        for def in &batch.routes {
            if !def.path.uri.starts_with('/') {
                return Err(GatewayError::InvalidPathPattern(
                    def.id.to_string(),
                    "path pattern must start with '/'".to_string(),
                ));
            }
            let live = routes.iter().any(|entry| entry.definition.id == def.id);
            if live || !seen.insert(def.id.clone()) {
                return Err(GatewayError::DuplicateRoute(def.id.to_string()));
            }
        }

        for definition in batch.routes {
            // Insert maintaining descending priority order.
            let priority = definition.path.priority;
            let pos = routes.partition_point(|entry| entry.definition.path.priority >= priority);
            debug!(route_id = %definition.id, api_id = %batch.api_id, "route added");
            routes.insert(
                pos,
                RouteEntry {
                    definition,
                    running: true,
                },
            );
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
