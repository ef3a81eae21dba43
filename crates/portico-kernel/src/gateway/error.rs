//! Gateway error types for `portico-kernel`.
//!
//! [`GatewayError`] covers every failure a kernel contract can report: route
//! table conflicts, malformed path templates, descriptor resolution failures
//! and running-state store faults. HTTP-facing failures (upstream timeouts,
//! bad admin payloads) belong in `portico-gateway`.

use thiserror::Error;

/// Error type shared by every kernel contract.
///
/// The enum is `#[non_exhaustive]` so future releases can add new failure
/// modes without breaking existing `match` arms.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GatewayError {
    // ── API definitions ──────────────────────────────────────────────────────
    /// An API definition `id` field is empty or whitespace-only.
    #[error("api id cannot be empty")]
    EmptyApiId,

    /// An API definition `id` contains a character reserved by route ids.
    #[error("api id '{0}' is invalid: {1}")]
    InvalidApiId(String, String),

    // ── Routes ───────────────────────────────────────────────────────────────
    /// A route with this id is already registered in the engine.
    #[error("route '{0}' is already registered")]
    DuplicateRoute(String),

    /// No route with this id is currently registered.
    #[error("route '{0}' is not registered")]
    RouteNotFound(String),

    /// A route path template is syntactically invalid.
    #[error("route '{0}' has an invalid path pattern: {1}")]
    InvalidPathPattern(String, String),

    // ── Descriptors ──────────────────────────────────────────────────────────
    /// The descriptor document could not be fetched.
    #[error("descriptor '{0}' is unavailable: {1}")]
    DescriptorUnavailable(String, String),

    /// The descriptor document was fetched but could not be understood.
    #[error("descriptor '{0}' is invalid: {1}")]
    DescriptorInvalid(String, String),

    // ── Stores ───────────────────────────────────────────────────────────────
    /// A backing store rejected an operation.
    #[error("store failure: {0}")]
    Store(String),
}
