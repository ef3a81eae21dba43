//! Call-context header names.
//!
//! Header names are lowercase because [`GatewayRequest`](super::GatewayRequest)
//! normalises every header key on insertion.

/// Identifier of the API the call is addressed to.
pub const API_ID: &str = "x-api-id";

/// Bearer credential, `Bearer <token>`.
pub const AUTHORIZATION: &str = "authorization";

/// Identifier of the route that matched the call.
pub const ROUTE_ID: &str = "x-route-id";

/// Numeric HTTP status chosen by the upstream failure producer.
pub const REASON_CODE: &str = "x-reason-code";

/// Human-readable failure message chosen by the upstream failure producer.
pub const REASON_MESSAGE: &str = "x-reason-message";

/// Marker consumed and stripped by the authorization gate.
pub const BLOCK_IF_IN_ERROR: &str = "x-block-if-in-error";

/// Prefix of the bearer credential inside [`AUTHORIZATION`].
pub const BEARER_PREFIX: &str = "Bearer ";
