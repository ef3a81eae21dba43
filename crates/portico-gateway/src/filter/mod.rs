//! Call filters and the pipeline that runs them.

mod auth;
mod logger;
mod throttle;

pub use auth::AuthorizationGate;
pub use logger::LoggingFilter;
pub use throttle::ThrottleFilter;

use portico_kernel::gateway::{
    FilterAction, GatewayContext, GatewayError, GatewayFilter, GatewayResponse,
};
use std::sync::Arc;
use tracing::debug;

/// Ordered list of filters executed as a pipeline.
///
/// Filters are sorted by [`FilterOrder`](portico_kernel::gateway::FilterOrder)
/// in ascending order (lowest value runs first on the request path).
pub struct FilterPipeline {
    filters: Vec<Arc<dyn GatewayFilter>>,
}

impl FilterPipeline {
    /// Build a pipeline from a list of filters, sorted by their declared order.
    pub fn new(mut filters: Vec<Arc<dyn GatewayFilter>>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { filters }
    }

    /// Names of the filters in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Run every `on_request` hook in ascending order, stopping at the first
    /// filter that diverts the call.
    pub async fn run_request(
        &self,
        ctx: &mut GatewayContext,
    ) -> Result<FilterAction, GatewayError> {
        for filter in &self.filters {
            match filter.on_request(ctx).await? {
                FilterAction::Continue => {}
                other => {
                    debug!(request_id = %ctx.request.id, filter = filter.name(), "call diverted");
                    return Ok(other);
                }
            }
        }
        Ok(FilterAction::Continue)
    }

    /// Run every `on_response` hook in descending order.
    pub async fn run_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        for filter in self.filters.iter().rev() {
            filter.on_response(ctx, resp).await?;
        }
        Ok(())
    }

    /// Tell every filter, in descending order, that the call was rejected.
    pub async fn run_rejected(&self, ctx: &GatewayContext, status: u16) {
        for filter in self.filters.iter().rev() {
            filter.on_rejected(ctx, status).await;
        }
    }
}
