//! Gateway control-plane kernel contract.
//!
//! This module defines the *trait interfaces and data types* shared by the
//! Portico control plane. No concrete implementations live here; those
//! belong in `portico-gateway`.
//!
//! # Architecture mapping
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              portico-kernel  (this module)                  │
//! │  ApiDefinition / PathSpec     route_id() (RouteIdentity)    │
//! │  RouteEngine trait            DescriptorResolver trait      │
//! │  RegistryListener trait       RunningApiStore trait         │
//! │  GatewayFilter trait          GatewayContext / AuthOutcome  │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │  depends on
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │              portico-gateway  (runtime crate)               │
//! │  InMemoryRouteEngine: impl RouteEngine                      │
//! │  RegistrySync: impl RegistryListener                        │
//! │  AuthorizationGate / ThrottleFilter / LoggingFilter         │
//! │  ErrorSurface + GatewayServer (axum HTTP server)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use portico_kernel::gateway::{route_id, ApiDefinition, HttpMethod, PathSpec};
//!
//! let api = ApiDefinition::new("orders", "http://orders.internal:8080")
//!     .with_path(PathSpec::new(HttpMethod::Get, "/orders/{id}"));
//!
//! let ids: Vec<_> = api
//!     .paths()
//!     .iter()
//!     .map(|p| route_id(&api.id, p))
//!     .collect();
//! assert_eq!(ids[0].as_str(), "orders:GET:/orders/{id}");
//! ```

pub mod api;
pub mod auth;
pub mod descriptor;
pub mod error;
pub mod filter;
pub mod headers;
pub mod registry;
pub mod route;
pub mod running;

// ── Flat re-exports ────────────────────────────────────────────────────────

pub use api::{ApiDefinition, PathSpec, RouteSource, ThrottlingPolicy};
pub use auth::AuthOutcome;
pub use descriptor::DescriptorResolver;
pub use error::GatewayError;
pub use filter::{FilterAction, FilterOrder, GatewayFilter};
pub use registry::{RegistryEvent, RegistryListener};
pub use route::{
    ROUTE_ID_SEPARATOR, RouteBatch, RouteDefinition, RouteEngine, RouteId, RouteStrategy, route_id,
};
pub use running::{RunningApi, RunningApiStore};

// types module is pub so implementors in portico-gateway can use the structs
pub mod types;
pub use types::{GatewayContext, GatewayRequest, GatewayResponse, HttpMethod, RouteMatch};
