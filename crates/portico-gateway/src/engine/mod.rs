//! Route engine module.

mod table;

pub use table::InMemoryRouteEngine;
