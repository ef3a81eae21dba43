//! Descriptor-backed path resolution.

mod openapi;

pub use openapi::{OpenApiResolver, paths_from_document};
