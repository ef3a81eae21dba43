//! Core data types for the gateway kernel contract.
//!
//! These types are shared across the gateway traits
//! ([`RouteEngine`](super::route::RouteEngine),
//! [`GatewayFilter`](super::filter::GatewayFilter),
//! [`RunningApiStore`](super::running::RunningApiStore))
//! and carry no runtime dependencies beyond `serde` and `std`.

use super::api::ThrottlingPolicy;
use super::auth::AuthOutcome;
use super::headers;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// HTTP primitives
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP method, covering the standard verbs used in REST and proxy scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[non_exhaustive]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Case-insensitive parse from a string slice.
    pub fn from_str_ci(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "PATCH" => Some(HttpMethod::Patch),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    /// Return the standard uppercase string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / Response
// ─────────────────────────────────────────────────────────────────────────────

/// An inbound call flowing through the gateway.
///
/// All fields use owned types so the struct can be sent across async task
/// boundaries without lifetime complications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// Unique identifier for correlating this call across logs.
    pub id: String,
    /// Request path including any query string, e.g. `/orders/7?x=1`.
    pub path: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// HTTP headers (header names are lowercased).
    pub headers: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
}

impl GatewayRequest {
    /// Construct a minimal request with the given id, path, and method.
    pub fn new(id: impl Into<String>, path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            method,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Builder helper: attach a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Path without the query string.
    pub fn path_only(&self) -> &str {
        self.path.split('?').next().unwrap_or(&self.path)
    }
}

/// A response produced by an upstream and returned through the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// HTTP status code (100–599).
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Raw body bytes.
    pub body: Vec<u8>,
    /// Id of the API whose upstream generated this response.
    pub api_id: String,
    /// Round-trip latency in milliseconds (gateway → upstream → gateway).
    pub latency_ms: u64,
}

impl GatewayResponse {
    /// Construct a minimal response.
    pub fn new(status: u16, api_id: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
            api_id: api_id.into(),
            latency_ms: 0,
        }
    }

    /// Builder helper: attach a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Builder helper: set the body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Route match
// ─────────────────────────────────────────────────────────────────────────────

/// The result of a successful route lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatch {
    /// Id of the matched route.
    pub route_id: String,
    /// Id of the API the route belongs to.
    pub api_id: String,
    /// Upstream base URL the call is forwarded to.
    pub upstream: String,
    /// Path parameters extracted from the URL template.
    pub path_params: HashMap<String, String>,
    /// Throttling override declared on the matched path.
    pub throttling: Option<ThrottlingPolicy>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Call context
// ─────────────────────────────────────────────────────────────────────────────

/// Mutable context that flows through the filter chain for a single call.
///
/// Failure producers never raise past the pipeline: they record a reason
/// code and message as headers here and return
/// [`FilterAction::Divert`](super::filter::FilterAction::Divert). Those two
/// headers are the only inputs the error surface sees.
#[derive(Debug, Clone)]
pub struct GatewayContext {
    /// The inbound request.
    pub request: GatewayRequest,
    /// Populated after routing; `None` if routing has not yet occurred.
    pub route_match: Option<RouteMatch>,
    /// Outcome recorded by the authorization gate; `None` before it runs.
    pub auth_outcome: Option<AuthOutcome>,
    /// Free-form attributes written and read by filters.
    pub attributes: HashMap<String, serde_json::Value>,
}

impl GatewayContext {
    /// Create a fresh context from an inbound request.
    pub fn new(request: GatewayRequest) -> Self {
        Self {
            request,
            route_match: None,
            auth_outcome: None,
            attributes: HashMap::new(),
        }
    }

    /// Read a header by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request
            .headers
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Set a header, replacing any previous value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.request.headers.insert(name.to_lowercase(), value.into());
    }

    /// Remove a header, returning its value if it was present.
    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.request.headers.remove(&name.to_lowercase())
    }

    /// Record the reason code and message consumed by the error surface.
    pub fn set_reason(&mut self, code: u16, message: impl Into<String>) {
        self.set_header(headers::REASON_CODE, code.to_string());
        self.set_header(headers::REASON_MESSAGE, message);
    }

    /// Drop any reason code and message, e.g. ones copied in from the caller.
    pub fn clear_reason(&mut self) {
        self.remove_header(headers::REASON_CODE);
        self.remove_header(headers::REASON_MESSAGE);
    }

    /// Route id of the matched route, if routing has happened.
    pub fn route_id(&self) -> Option<&str> {
        self.header(headers::ROUTE_ID)
    }

    /// Convenience: read a typed attribute, returning `None` if absent or
    /// if deserialization fails.
    pub fn get_attr<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Convenience: write a serializable attribute.
    pub fn set_attr<T: serde::Serialize>(&mut self, key: impl Into<String>, val: &T) {
        if let Ok(v) = serde_json::to_value(val) {
            self.attributes.insert(key.into(), v);
        }
    }
}
