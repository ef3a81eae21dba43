//! Administrative endpoints
//!
//! GET    /admin/apis                            - list API definitions
//! PUT    /admin/apis/{id}                       - create or replace a definition
//! DELETE /admin/apis/{id}                       - delete a definition
//! GET    /admin/routes                          - live routes with running state
//! PUT    /admin/routes/{route_id}/suspension    - set a suspension message
//! DELETE /admin/routes/{route_id}/suspension    - clear suspension and blocked flag
//!
//! Route ids contain `/`, so they must be percent-encoded in the path.
//! API changes are applied to the route table asynchronously, which is why
//! mutations answer `202 Accepted`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};
use portico_kernel::gateway::{
    ApiDefinition, GatewayError, HttpMethod, RouteEngine, RouteId, RunningApi, RunningApiStore,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::info;

use crate::error::{GatewayResult, GatewayRuntimeError};
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// One entry of GET /admin/routes
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteDto {
    pub id: RouteId,
    pub api_id: String,
    pub method: HttpMethod,
    pub uri: String,
    pub priority: i32,
    pub suspension_message: Option<String>,
    pub blocked: bool,
}

/// Body of PUT /admin/routes/{route_id}/suspension
#[derive(Debug, Deserialize)]
pub struct SuspensionRequest {
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

pub async fn list_apis(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.list())
}

/// PUT /admin/apis/{id}
///
/// The id in the path must equal the id in the body.
pub async fn put_api(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(api): Json<ApiDefinition>,
) -> GatewayResult<impl IntoResponse> {
    if api.id != id {
        return Err(GatewayRuntimeError::InvalidRequest(format!(
            "path id '{id}' does not match body id '{}'",
            api.id
        )));
    }
    state.registry.put(api)?;
    info!(api_id = %id, "api definition stored");
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id, "status": "accepted" }))))
}

pub async fn delete_api(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> GatewayResult<impl IntoResponse> {
    state
        .registry
        .delete(&id)
        .ok_or_else(|| GatewayRuntimeError::ApiNotFound(id.clone()))?;
    info!(api_id = %id, "api definition deleted");
    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id, "status": "deleted" }))))
}

pub async fn list_routes(State(state): State<AppState>) -> impl IntoResponse {
    // Read the snapshot rather than `get`, which would create records.
    let running: HashMap<String, RunningApi> = state.running.list().into_iter().collect();
    let routes: Vec<RouteDto> = state
        .engine
        .routes()
        .into_iter()
        .map(|def| {
            let status = running.get(def.id.as_str()).cloned().unwrap_or_default();
            RouteDto {
                id: def.id,
                api_id: def.api_id,
                method: def.path.method,
                uri: def.path.uri,
                priority: def.path.priority,
                suspension_message: status.suspension_message,
                blocked: status.blocked,
            }
        })
        .collect();
    Json(routes)
}

/// PUT /admin/routes/{route_id}/suspension
///
/// Only routes present in the route table can be suspended.
pub async fn suspend_route(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
    Json(req): Json<SuspensionRequest>,
) -> GatewayResult<impl IntoResponse> {
    if req.message.trim().is_empty() {
        return Err(GatewayRuntimeError::InvalidRequest(
            "suspension message must not be empty".into(),
        ));
    }
    if !state.engine.route_exists(&RouteId::from_raw(route_id.as_str())) {
        return Err(GatewayError::RouteNotFound(route_id).into());
    }
    let message = req.message;
    let updated = state
        .running
        .upsert(&route_id, &|s| s.suspension_message = Some(message.clone()))?;
    info!(route_id = %route_id, "route suspended");
    Ok(Json(updated))
}

/// DELETE /admin/routes/{route_id}/suspension
///
/// Clears the suspension message and lifts the blocked state of a route
/// present in the route table.
pub async fn resume_route(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> GatewayResult<impl IntoResponse> {
    if !state.engine.route_exists(&RouteId::from_raw(route_id.as_str())) {
        return Err(GatewayError::RouteNotFound(route_id).into());
    }
    let updated = state.running.upsert(&route_id, &|s| {
        s.suspension_message = None;
        s.blocked = false;
    })?;
    info!(route_id = %route_id, "route resumed");
    Ok(Json(updated))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/admin/apis", get(list_apis))
        .route("/admin/apis/{id}", put(put_api).delete(delete_api))
        .route("/admin/routes", get(list_routes))
        .route(
            "/admin/routes/{route_id}/suspension",
            put(suspend_route).delete(resume_route),
        )
}
