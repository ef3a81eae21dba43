//! Route identity and the route-engine contract.
//!
//! [`route_id`] is the single deterministic mapping from an API id and one of
//! its [`PathSpec`]s to the identifier of the live route they produce. The
//! [`RouteEngine`] trait is everything the control plane knows about the
//! engine that actually serves those routes.

use super::api::{ApiDefinition, PathSpec};
use super::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// RouteId
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier of a live route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(String);

impl RouteId {
    /// Wrap an already-derived identifier (e.g. one read back from a header).
    pub fn from_raw(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RouteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Separator between the components of a route id.
///
/// API ids may not contain it, which keeps ids unique: the first separator
/// ends the API id, the second ends the method, the rest is the template.
pub const ROUTE_ID_SEPARATOR: char = ':';

/// Derive the route identifier for `(api_id, path)`.
///
/// The result is `<api_id>:<METHOD>:<uri>` with trailing slashes removed
/// from the template (the root template `/` is kept). Only the method and
/// template take part; priority and throttling do not change the identity.
pub fn route_id(api_id: &str, path: &PathSpec) -> RouteId {
    let trimmed = path.uri.trim_end_matches('/');
    let uri = if trimmed.is_empty() { "/" } else { trimmed };
    let sep = ROUTE_ID_SEPARATOR;
    RouteId(format!("{api_id}{sep}{}{sep}{uri}", path.method.as_str()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Route batches
// ─────────────────────────────────────────────────────────────────────────────

/// Which generation strategy produced a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStrategy {
    /// Paths declared inline on the definition.
    Direct,
    /// Paths resolved from a descriptor document.
    Descriptor,
}

/// Everything an engine needs to serve one route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDefinition {
    pub id: RouteId,
    pub api_id: String,
    pub upstream: String,
    pub path: PathSpec,
}

/// A set of routes added together for one API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteBatch {
    pub api_id: String,
    pub strategy: RouteStrategy,
    pub routes: Vec<RouteDefinition>,
}

impl RouteBatch {
    /// Build a batch with one route per stored path of `api`.
    pub fn for_api(api: &ApiDefinition, strategy: RouteStrategy) -> Self {
        let routes = api
            .paths()
            .iter()
            .map(|path| RouteDefinition {
                id: route_id(&api.id, path),
                api_id: api.id.clone(),
                upstream: api.upstream.clone(),
                path: path.clone(),
            })
            .collect();
        Self {
            api_id: api.id.clone(),
            strategy,
            routes,
        }
    }

    pub fn route_ids(&self) -> Vec<RouteId> {
        self.routes.iter().map(|r| r.id.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RouteEngine trait
// ─────────────────────────────────────────────────────────────────────────────

/// Kernel contract for the engine that serves live routes.
///
/// Each call is individually atomic; sequences of calls are not. `stop_route`
/// and `remove_route` tolerate an absent route and return `Ok(())` for it.
/// `add_routes` is all-or-nothing: it fails with
/// [`GatewayError::DuplicateRoute`] without registering anything when any id
/// in the batch is already live.
pub trait RouteEngine: Send + Sync {
    fn route_exists(&self, id: &RouteId) -> bool;

    /// Stop serving traffic on a route without removing it.
    fn stop_route(&self, id: &RouteId) -> Result<(), GatewayError>;

    fn remove_route(&self, id: &RouteId) -> Result<(), GatewayError>;

    fn add_routes(&self, batch: RouteBatch) -> Result<(), GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::types::HttpMethod;

    #[test]
    fn route_id_is_deterministic() {
        let path = PathSpec::new(HttpMethod::Get, "/orders/{id}");
        assert_eq!(route_id("orders", &path), route_id("orders", &path));
        assert_eq!(route_id("orders", &path).as_str(), "orders:GET:/orders/{id}");
    }

    #[test]
    fn route_id_distinguishes_method_and_api() {
        let get = PathSpec::new(HttpMethod::Get, "/orders");
        let post = PathSpec::new(HttpMethod::Post, "/orders");
        assert_ne!(route_id("orders", &get), route_id("orders", &post));
        assert_ne!(route_id("orders", &get), route_id("billing", &get));
    }

    #[test]
    fn route_id_ignores_trailing_slash_and_metadata() {
        let a = PathSpec::new(HttpMethod::Get, "/orders/");
        let b = PathSpec::new(HttpMethod::Get, "/orders").with_priority(9);
        assert_eq!(route_id("orders", &a), route_id("orders", &b));
        let root = PathSpec::new(HttpMethod::Get, "/");
        assert_eq!(route_id("orders", &root).as_str(), "orders:GET:/");
    }

    #[test]
    fn colons_in_template_stay_inside_uri_component() {
        let odd = PathSpec::new(HttpMethod::Get, "/p:POST:/q");
        let id = route_id("a", &odd);
        assert_eq!(id.as_str(), "a:GET:/p:POST:/q");
        assert_ne!(id, route_id("a", &PathSpec::new(HttpMethod::Post, "/q")));
        assert_ne!(id, route_id("b", &odd));
    }

    #[test]
    fn batch_has_one_route_per_path() {
        let api = ApiDefinition::new("orders", "http://orders")
            .with_path(PathSpec::new(HttpMethod::Get, "/orders"))
            .with_path(PathSpec::new(HttpMethod::Post, "/orders"));
        let batch = RouteBatch::for_api(&api, RouteStrategy::Direct);
        assert_eq!(batch.routes.len(), 2);
        assert_eq!(batch.routes[0].upstream, "http://orders");
        assert_eq!(
            batch.route_ids(),
            vec![
                RouteId::from_raw("orders:GET:/orders"),
                RouteId::from_raw("orders:POST:/orders"),
            ]
        );
    }
}
