//! `portico-gateway`: Portico API gateway runtime.
//!
//! This crate provides the concrete implementations of the contracts defined
//! in `portico-kernel::gateway`:
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | [`RouteEngine`] | [`engine::InMemoryRouteEngine`] |
//! | [`RegistryListener`] | [`sync::RegistrySync`] |
//! | [`DescriptorResolver`] | [`descriptor::OpenApiResolver`] |
//! | [`RunningApiStore`] | [`running::InMemoryRunningApiStore`] |
//! | [`GatewayFilter`] | [`filter::AuthorizationGate`], [`filter::ThrottleFilter`], [`filter::LoggingFilter`] |
//!
//! API definitions live in [`registry::InMemoryApiRegistry`]; every change
//! is broadcast and applied to the route table by [`sync::RegistrySync`].
//! Rejected calls are rendered by [`surface::ErrorSurface`]. The
//! [`server::GatewayServer`] wires everything together into an axum HTTP
//! service.
//!
//! [`RouteEngine`]: portico_kernel::gateway::RouteEngine
//! [`RegistryListener`]: portico_kernel::gateway::RegistryListener
//! [`DescriptorResolver`]: portico_kernel::gateway::DescriptorResolver
//! [`RunningApiStore`]: portico_kernel::gateway::RunningApiStore
//! [`GatewayFilter`]: portico_kernel::gateway::GatewayFilter
//!
//! # Quick start
//!
//! ```rust,no_run
//! use portico_gateway::config::GatewayServerConfig;
//! use portico_gateway::keys::KeySet;
//! use portico_gateway::server::GatewayServer;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let keys = KeySet::from_file("jwks.json").unwrap();
//!     let server = GatewayServer::new(GatewayServerConfig::default(), Arc::new(keys));
//!     server.start().await.unwrap();
//! }
//! ```

pub mod backend;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod keys;
pub mod registry;
pub mod running;
pub mod server;
pub mod state;
pub mod surface;
pub mod sync;

// Re-export the kernel gateway types for convenience.
pub use portico_kernel::gateway;
