//! HTTP handlers for the fixed gateway endpoints.

pub mod admin;
pub mod health;

pub use admin::admin_router;
pub use health::health_router;
