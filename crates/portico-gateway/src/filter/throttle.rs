//! Per-route token-bucket throttling.
//!
//! Each route id owns one bucket sized by the matched path's
//! [`ThrottlingPolicy`] or, when the path declares none, by the gateway
//! defaults. Tokens refill continuously: on each call the elapsed wall-clock
//! time is converted to tokens before one is consumed. Routes whose policy
//! sets `block_if_in_error` are refused outright once they are blocked.
//!
//! Rejections divert without reason fields, so the error surface answers
//! with its throttling status.
//!
//! Buckets of routes that are no longer registered are dropped whenever a new
//! bucket is created, so the map never outgrows the route table.

use async_trait::async_trait;
use portico_kernel::gateway::{
    FilterAction, FilterOrder, GatewayContext, GatewayError, GatewayFilter, GatewayResponse,
    RouteEngine, RouteId, RunningApiStore, ThrottlingPolicy,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, warn};

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    /// Refill for the elapsed time, then take one token if available.
    fn try_consume(&mut self, policy: &ThrottlingPolicy) -> bool {
        let capacity = f64::from(policy.burst_capacity);
        let now = Instant::now();
        let refill = now.duration_since(self.last_refill).as_secs_f64()
            * f64::from(policy.rate_per_second);
        self.tokens = (self.tokens + refill).min(capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Throttling collaborator run after authorization.
pub struct ThrottleFilter {
    defaults: ThrottlingPolicy,
    running: Arc<dyn RunningApiStore>,
    engine: Arc<dyn RouteEngine>,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl ThrottleFilter {
    pub fn new(
        defaults: ThrottlingPolicy,
        running: Arc<dyn RunningApiStore>,
        engine: Arc<dyn RouteEngine>,
    ) -> Self {
        Self {
            defaults,
            running,
            engine,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Number of routes currently holding a bucket.
    pub async fn tracked_routes(&self) -> usize {
        self.buckets.lock().await.len()
    }

    fn policy(&self, ctx: &GatewayContext) -> ThrottlingPolicy {
        ctx.route_match
            .as_ref()
            .and_then(|m| m.throttling)
            .unwrap_or(self.defaults)
    }
}

#[async_trait]
impl GatewayFilter for ThrottleFilter {
    fn name(&self) -> &str {
        "throttle"
    }

    fn order(&self) -> FilterOrder {
        FilterOrder::RATE_LIMIT
    }

    async fn on_request(&self, ctx: &mut GatewayContext) -> Result<FilterAction, GatewayError> {
        let Some(route_id) = ctx.route_id().map(str::to_string) else {
            return Ok(FilterAction::Continue);
        };
        let policy = self.policy(ctx);

        if policy.block_if_in_error && self.running.get(&route_id).blocked {
            warn!(request_id = %ctx.request.id, route_id = %route_id, "route is blocked");
            return Ok(FilterAction::Divert);
        }

        let allowed = {
            let mut buckets = self.buckets.lock().await;
            if !buckets.contains_key(&route_id) {
                let before = buckets.len();
                buckets.retain(|id, _| self.engine.route_exists(&RouteId::from_raw(id.as_str())));
                if buckets.len() < before {
                    debug!(dropped = before - buckets.len(), "pruned buckets of removed routes");
                }
            }
            buckets
                .entry(route_id.clone())
                .or_insert_with(|| Bucket::new(f64::from(policy.burst_capacity)))
                .try_consume(&policy)
        };

        if allowed {
            Ok(FilterAction::Continue)
        } else {
            warn!(request_id = %ctx.request.id, route_id = %route_id, "rate limit exceeded");
            Ok(FilterAction::Divert)
        }
    }

    async fn on_response(
        &self,
        ctx: &GatewayContext,
        resp: &mut GatewayResponse,
    ) -> Result<(), GatewayError> {
        resp.headers.insert(
            "x-ratelimit-limit".to_string(),
            self.policy(ctx).burst_capacity.to_string(),
        );
        Ok(())
    }
}
