//! Gateway filter trait and ordering.
//!
//! A filter chain is an ordered list of [`GatewayFilter`] instances applied
//! to every routed call. Filters are sorted by their declared
//! [`FilterOrder`] and executed in ascending order on the request path
//! (lowest value first) and descending order on the response path.
//!
//! ```text
//! Request  ──► Auth ──► RateLimit ──► Logging ──► upstream
//!                 │          │
//!                 └──────────┴──► Divert ──► error surface
//! Response ◄── Logging ◄── RateLimit ◄── Auth ◄── upstream
//! ```
//!
//! Calls that end at the error surface are reported to every filter through
//! [`GatewayFilter::on_rejected`], including filters the call never reached.

use super::error::GatewayError;
use super::types::{GatewayContext, GatewayResponse};
use async_trait::async_trait;

// ─────────────────────────────────────────────────────────────────────────────
// Filter ordering
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric ordering slot for a filter in the chain.
///
/// Any `u32` value is accepted so implementors can slot custom filters
/// between the standard phases. Equal values run in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FilterOrder(pub u32);

impl FilterOrder {
    /// Executes before authentication (e.g. request id injection).
    pub const PRE_AUTH: FilterOrder = FilterOrder(0);
    /// Authorization gate slot.
    pub const AUTH: FilterOrder = FilterOrder(100);
    /// Throttling slot.
    pub const RATE_LIMIT: FilterOrder = FilterOrder(200);
    /// Access logging slot.
    pub const LOGGING: FilterOrder = FilterOrder(400);
}

// ─────────────────────────────────────────────────────────────────────────────
// Filter action
// ─────────────────────────────────────────────────────────────────────────────

/// Instruction returned by [`GatewayFilter::on_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FilterAction {
    /// Pass the (possibly modified) call to the next filter or the upstream.
    Continue,
    /// Stop the chain and hand the call to the error surface. Any reason code
    /// and message must already be recorded on the context.
    Divert,
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayFilter trait
// ─────────────────────────────────────────────────────────────────────────────

/// Kernel contract for a single filter in the call pipeline.
#[async_trait]
pub trait GatewayFilter: Send + Sync {
    /// Stable, human-readable identifier for this filter (used in logs).
    fn name(&self) -> &str;

    /// Position in the filter chain.
    fn order(&self) -> FilterOrder;

    /// Called with the inbound call *before* it is forwarded upstream.
    ///
    /// An `Err` is reserved for faults in the filter itself; rejections of
    /// the call are expressed as [`FilterAction::Divert`].
    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError>;

    /// Called with the upstream response *before* it is returned to the caller.
    async fn on_response(
        &self,
        _ctx: &GatewayContext,
        _resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    /// Called once the error surface has answered the call with `status`.
    async fn on_rejected(&self, _ctx: &GatewayContext, _status: u16) {}
}
