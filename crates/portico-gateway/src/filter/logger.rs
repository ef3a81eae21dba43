//! Access log.
//!
//! Every routed call produces exactly one access line: from the response hook
//! when the upstream answered, or from the rejection hook when the error
//! surface did. A call rejected before it reached this filter has no start
//! stamp, so its line carries no latency.

use super::auth::SUBJECT_ATTR;
use async_trait::async_trait;
use portico_kernel::gateway::{
    FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter, GatewayResponse,
    headers,
};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

const STARTED_AT_ATTR: &str = "access_log.started_at_ms";

#[derive(Default)]
pub struct LoggingFilter;

impl LoggingFilter {
    pub fn new() -> Self {
        Self
    }
}

/// Milliseconds since this filter admitted the call.
fn elapsed_ms(ctx: &GatewayContext) -> Option<u64> {
    let started: u64 = ctx.get_attr(STARTED_AT_ATTR)?;
    Some(epoch_ms().saturating_sub(started))
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[async_trait]
impl GatewayFilter for LoggingFilter {
    fn name(&self) -> &str {
        "access-log"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::LOGGING
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        ctx.set_attr(STARTED_AT_ATTR, &epoch_ms());
        debug!(
            request_id = %ctx.request.id,
            route_id = ctx.route_id().unwrap_or_default(),
            "call admitted"
        );
        Ok(FilterAction::Continue)
    }

    async fn on_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        let latency_ms = elapsed_ms(ctx).unwrap_or_default();
        resp.latency_ms = latency_ms;
        let subject: Option<String> = ctx.get_attr(SUBJECT_ATTR);
        info!(
            request_id = %ctx.request.id,
            method = ctx.request.method.as_str(),
            path = ctx.request.path_only(),
            route_id = ctx.route_id().unwrap_or_default(),
            api_id = %resp.api_id,
            subject = ?subject,
            status = resp.status,
            latency_ms,
            "call completed"
        );
        Ok(())
    }

    async fn on_rejected(&self, ctx: &GatewayContext, status: u16) {
        let subject: Option<String> = ctx.get_attr(SUBJECT_ATTR);
        warn!(
            request_id = %ctx.request.id,
            method = ctx.request.method.as_str(),
            path = ctx.request.path_only(),
            route_id = ctx.route_id().unwrap_or_default(),
            subject = ?subject,
            status,
            reason = ctx.header(headers::REASON_MESSAGE).unwrap_or_default(),
            latency_ms = ?elapsed_ms(ctx),
            "call rejected"
        );
    }
}
