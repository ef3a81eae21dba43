//! Per-route running state.
//!
//! A [`RunningApi`] is created lazily the first time a route id is looked up
//! and is only changed through [`RunningApiStore::upsert`], which applies an
//! update atomically per key.

use super::error::GatewayError;
use serde::{Deserialize, Serialize};

/// Running state of one route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningApi {
    /// Message surfaced verbatim on every failure of this route.
    pub suspension_message: Option<String>,
    /// Set on every pass through the error surface. Nothing in the gateway
    /// core clears it.
    pub blocked: bool,
}

/// Keyed store of [`RunningApi`] records.
pub trait RunningApiStore: Send + Sync {
    /// Current state of `route_id`, creating a default record if absent.
    fn get(&self, route_id: &str) -> RunningApi;

    /// Apply `update` to the record of `route_id` (created if absent) as one
    /// atomic step and return the updated record.
    fn upsert(
        &self,
        route_id: &str,
        update: &dyn Fn(&mut RunningApi),
    ) -> Result<RunningApi, GatewayError>;

    /// Drop the record of `route_id`. Absent records are not an error.
    fn remove(&self, route_id: &str);

    /// Snapshot of every record, sorted by route id.
    fn list(&self) -> Vec<(String, RunningApi)>;
}
