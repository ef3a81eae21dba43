//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] wires the route table, registry synchronisation, filter
//! pipeline, error surface and upstream proxy into a running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Liveness check with the live route count. |
//! | `GET/POST/PUT/DELETE` | `/error` | Error surface. |
//! | various | `/admin/...` | API registry and route administration. |
//! | `ANY`  | anything else | Resolved against the live route table and proxied. |

use crate::config::GatewayServerConfig;
use crate::error::{GatewayResult, GatewayRuntimeError};
use crate::handlers::{admin_router, health_router};
use crate::keys::KeySet;
use crate::state::AppState;
use crate::surface::error_router;
use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use portico_kernel::gateway::{
    FilterAction, GatewayContext, GatewayRequest, GatewayResponse, HttpMethod, headers,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Upstream response headers that are recomputed by the gateway.
const HOP_BY_HOP: &[&str] = &["connection", "content-length", "transfer-encoding"];

/// Gateway process: configuration plus verification keys.
pub struct GatewayServer {
    config: GatewayServerConfig,
    keys: Arc<KeySet>,
}

impl GatewayServer {
    pub fn new(config: GatewayServerConfig, keys: Arc<KeySet>) -> Self {
        Self { config, keys }
    }

    /// Build the shared state, start registry synchronisation and return the
    /// router together with the state it serves.
    pub fn build_app(&self) -> GatewayResult<(Router, AppState)> {
        let state = AppState::build(&self.config, self.keys.clone())?;
        state.start_sync();
        Ok((build_router(state.clone()), state))
    }

    /// Bind to the configured address and serve until Ctrl-C.
    pub async fn start(self) -> GatewayResult<()> {
        let (app, _state) = self.build_app()?;
        let addr = self.config.listen_addr();
        info!(addr = %addr, keys = self.keys.len(), "Portico gateway starting");

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| GatewayRuntimeError::Internal(format!("bind {addr}: {e}")))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GatewayRuntimeError::Internal(e.to_string()))
    }
}

/// Mount every endpoint on `state`. Unmatched paths go to the proxy.
pub fn build_router(state: AppState) -> Router {
    let surface = state.surface.clone();
    Router::new()
        .merge(health_router())
        .merge(admin_router())
        .merge(error_router(surface))
        .fallback(proxy_handler)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

// ─────────────────────────────────────────────────────────────────────────────
// Proxy handler
// ─────────────────────────────────────────────────────────────────────────────

/// Route the call, run the filter pipeline, then forward it upstream.
///
/// Every rejection after a route matched is rendered by the error surface
/// from the reason recorded on the call context.
async fn proxy_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    header_map: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let Some(http_method) = HttpMethod::from_str_ci(method.as_str()) else {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": format!("method '{method}' is not supported") })),
        )
            .into_response();
    };
    let request_id = Uuid::new_v4().to_string();

    let mut req = GatewayRequest::new(&request_id, &path, http_method);
    for (name, value) in &header_map {
        if let Ok(v) = value.to_str() {
            req = req.with_header(name.as_str(), v);
        }
    }
    req = req.with_body(body.to_vec());

    let Some(route_match) = state.engine.resolve(req.path_only(), &req.method) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no route matched '{} {}'", http_method, uri.path()) })),
        )
            .into_response();
    };

    // Reasons are only ever recorded by gateway components.
    let mut ctx = GatewayContext::new(req);
    ctx.clear_reason();
    ctx.set_header(headers::ROUTE_ID, route_match.route_id.clone());
    ctx.set_header(headers::API_ID, route_match.api_id.clone());
    ctx.route_match = Some(route_match);

    match state.pipeline.run_request(&mut ctx).await {
        Ok(FilterAction::Continue) => {}
        Ok(_) => return reject(&state, &ctx).await,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "filter pipeline fault");
            ctx.set_reason(500, e.to_string());
            return reject(&state, &ctx).await;
        }
    }

    let mut gateway_resp = match state.proxy.forward(&ctx).await {
        Ok(resp) => resp,
        Err(e) => {
            warn!(request_id = %request_id, error = %e, "upstream call failed");
            ctx.set_reason(502, e.to_string());
            return reject(&state, &ctx).await;
        }
    };

    if let Err(err) = state.pipeline.run_response(&ctx, &mut gateway_resp).await {
        warn!(
            request_id = %request_id,
            error = %err,
            "response filter pipeline error (upstream response still returned)"
        );
    }

    build_axum_response(gateway_resp)
}

/// Answer a routed call from the error surface and report the outcome.
async fn reject(state: &AppState, ctx: &GatewayContext) -> Response {
    let response = state.surface.render(ctx);
    state
        .pipeline
        .run_rejected(ctx, response.status().as_u16())
        .await;
    response
}

fn build_axum_response(resp: GatewayResponse) -> Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = Response::new(Body::from(resp.body));
    *response.status_mut() = status;

    let out = response.headers_mut();
    for (name, value) in &resp.headers {
        if HOP_BY_HOP.contains(&name.as_str()) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            out.insert(name, value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_headers_are_copied_without_hop_by_hop() {
        let resp = GatewayResponse::new(201, "a")
            .with_header("x-upstream", "yes")
            .with_header("transfer-encoding", "chunked")
            .with_body(b"{}".to_vec());
        let out = build_axum_response(resp);
        assert_eq!(out.status(), StatusCode::CREATED);
        assert_eq!(out.headers().get("x-upstream").unwrap(), "yes");
        assert!(out.headers().get("transfer-encoding").is_none());
    }
}
