//! API definitions as stored in the shared registry.
//!
//! An [`ApiDefinition`] is created, updated and deleted by an administrative
//! actor. The control plane only ever observes it.

use super::error::GatewayError;
use super::route::ROUTE_ID_SEPARATOR;
use super::types::HttpMethod;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Throttling policy
// ─────────────────────────────────────────────────────────────────────────────

/// Per-path throttling parameters read by the throttling collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottlingPolicy {
    /// Sustained token refill rate (calls per second).
    pub rate_per_second: u32,
    /// Maximum burst capacity.
    pub burst_capacity: u32,
    /// Refuse every call once the route has been marked blocked.
    #[serde(default)]
    pub block_if_in_error: bool,
}

impl ThrottlingPolicy {
    pub fn new(rate_per_second: u32, burst_capacity: u32) -> Self {
        Self {
            rate_per_second,
            burst_capacity,
            block_if_in_error: false,
        }
    }

    /// Builder: refuse traffic on blocked routes.
    pub fn blocking_on_error(mut self) -> Self {
        self.block_if_in_error = true;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PathSpec
// ─────────────────────────────────────────────────────────────────────────────

/// One method + URI template unit of an API, which becomes one route.
///
/// URI templates use the `{param}` syntax:
/// ```text
/// /orders              exact path
/// /orders/{id}         captures `id`
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSpec {
    pub method: HttpMethod,
    /// URL path template. Must begin with `/`.
    pub uri: String,
    /// Routing priority: higher values are evaluated first when several
    /// templates match the same path.
    #[serde(default)]
    pub priority: i32,
    /// Optional throttling override for this path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttling: Option<ThrottlingPolicy>,
}

impl PathSpec {
    pub fn new(method: HttpMethod, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            priority: 0,
            throttling: None,
        }
    }

    /// Builder: set routing priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: attach a throttling policy.
    pub fn with_throttling(mut self, policy: ThrottlingPolicy) -> Self {
        self.throttling = Some(policy);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ApiDefinition
// ─────────────────────────────────────────────────────────────────────────────

/// Where the authoritative path list of an API comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource<'a> {
    /// Paths declared inline on the definition.
    Direct(&'a [PathSpec]),
    /// Paths resolved from the descriptor document at this URL. Inline paths
    /// are ignored.
    Descriptor(&'a str),
}

/// An administratively declared backend service exposed through the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDefinition {
    /// Unique registry key.
    pub id: String,
    /// Base URL calls are forwarded to, e.g. `http://orders.internal:8080`.
    pub upstream: String,
    /// Declared paths. `None` and an empty list are equivalent.
    #[serde(default)]
    pub paths: Option<Vec<PathSpec>>,
    /// Descriptor document URL (OpenAPI / Swagger JSON).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor_endpoint: Option<String>,
}

impl ApiDefinition {
    pub fn new(id: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            upstream: upstream.into(),
            paths: None,
            descriptor_endpoint: None,
        }
    }

    /// Builder: append one declared path.
    pub fn with_path(mut self, path: PathSpec) -> Self {
        self.paths.get_or_insert_with(Vec::new).push(path);
        self
    }

    /// Builder: make this a descriptor-backed API.
    pub fn with_descriptor(mut self, endpoint: impl Into<String>) -> Self {
        self.descriptor_endpoint = Some(endpoint.into());
        self
    }

    /// Currently stored paths (empty when none are declared).
    pub fn paths(&self) -> &[PathSpec] {
        self.paths.as_deref().unwrap_or(&[])
    }

    /// Route-generation strategy. A descriptor endpoint always wins.
    pub fn route_source(&self) -> RouteSource<'_> {
        match self.descriptor_endpoint.as_deref() {
            Some(endpoint) => RouteSource::Descriptor(endpoint),
            None => RouteSource::Direct(self.paths()),
        }
    }

    /// Replace the stored paths with a resolved list.
    pub fn replace_paths(&mut self, paths: Vec<PathSpec>) {
        self.paths = Some(paths);
    }

    /// Structural checks run before a definition is accepted by the registry.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.id.trim().is_empty() {
            return Err(GatewayError::EmptyApiId);
        }
        if self.id.contains(ROUTE_ID_SEPARATOR) {
            return Err(GatewayError::InvalidApiId(
                self.id.clone(),
                format!("'{ROUTE_ID_SEPARATOR}' separates route id components"),
            ));
        }
        for path in self.paths() {
            if !path.uri.starts_with('/') {
                return Err(GatewayError::InvalidPathPattern(
                    self.id.clone(),
                    format!("'{}' must start with '/'", path.uri),
                ));
            }
        }
        Ok(())
    }
}
