//! Registry notifications driving the live route table.

mod common;

use async_trait::async_trait;
use common::*;
use parking_lot::Mutex;
use portico_gateway::config::GatewayServerConfig;
use portico_gateway::gateway::{
    ApiDefinition, DescriptorResolver, GatewayError, HttpMethod, PathSpec, RouteEngine, RouteId,
    RunningApiStore,
};
use portico_gateway::state::AppState;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Serves a mutable path list; `None` means the descriptor is unreachable.
struct FakeDescriptors(Mutex<Option<Vec<PathSpec>>>);

#[async_trait]
impl DescriptorResolver for FakeDescriptors {
    async fn resolve(&self, endpoint: &str) -> Result<Vec<PathSpec>, GatewayError> {
        self.0.lock().clone().ok_or_else(|| {
            GatewayError::DescriptorUnavailable(endpoint.to_string(), "connection refused".into())
        })
    }
}

fn gateway_with(resolved: Option<Vec<PathSpec>>) -> (AppState, Arc<FakeDescriptors>) {
    let descriptors = Arc::new(FakeDescriptors(Mutex::new(resolved)));
    let state =
        AppState::with_resolver(&GatewayServerConfig::default(), key_set(), descriptors.clone())
            .expect("state");
    state.start_sync();
    (state, descriptors)
}

fn live(state: &AppState) -> BTreeSet<String> {
    state.engine.routes().into_iter().map(|r| r.id.to_string()).collect()
}

fn set(ids: &[&str]) -> BTreeSet<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn descriptor_paths_replace_declared_ones() {
    let (state, _) = gateway_with(Some(vec![
        PathSpec::new(HttpMethod::Get, "/pets"),
        PathSpec::new(HttpMethod::Get, "/pets/{id}"),
    ]));

    let api = ApiDefinition::new("pets", "http://pets")
        .with_path(PathSpec::new(HttpMethod::Delete, "/pets"))
        .with_descriptor("http://pets/openapi.json");
    state.registry.put(api).unwrap();

    let expected = set(&["pets:GET:/pets", "pets:GET:/pets/{id}"]);
    eventually(|| live(&state) == expected).await;
}

#[tokio::test]
async fn shrinking_definition_drops_vanished_routes() {
    let (state, _) = gateway_with(None);
    let full = ApiDefinition::new("orders", "http://orders")
        .with_path(PathSpec::new(HttpMethod::Get, "/orders"))
        .with_path(PathSpec::new(HttpMethod::Post, "/orders"));
    state.registry.put(full).unwrap();
    eventually(|| state.engine.len() == 2).await;

    let trimmed = ApiDefinition::new("orders", "http://orders")
        .with_path(PathSpec::new(HttpMethod::Get, "/orders"));
    state.registry.put(trimmed).unwrap();

    let expected = set(&["orders:GET:/orders"]);
    eventually(|| live(&state) == expected).await;
}

#[tokio::test]
async fn unreachable_descriptor_leaves_other_apis_alone() {
    let (state, descriptors) = gateway_with(Some(vec![PathSpec::new(HttpMethod::Get, "/pets")]));
    state
        .registry
        .put(ApiDefinition::new("orders", "http://orders").with_path(PathSpec::new(HttpMethod::Get, "/orders")))
        .unwrap();
    state
        .registry
        .put(ApiDefinition::new("pets", "http://pets").with_descriptor("http://pets/openapi.json"))
        .unwrap();
    eventually(|| state.engine.len() == 2).await;

    // The descriptor goes away; the redeploy tears the pets routes down and
    // cannot add new ones.
    *descriptors.0.lock() = None;
    state
        .registry
        .put(ApiDefinition::new("pets", "http://pets").with_descriptor("http://pets/openapi.json"))
        .unwrap();

    let expected = set(&["orders:GET:/orders"]);
    eventually(|| live(&state) == expected).await;
}

#[tokio::test]
async fn removal_clears_running_state() {
    let (state, _) = gateway_with(None);
    state
        .registry
        .put(ApiDefinition::new("orders", "http://orders").with_path(PathSpec::new(HttpMethod::Get, "/orders")))
        .unwrap();
    eventually(|| state.engine.len() == 1).await;

    state.surface.reject(Some("orders:GET:/orders"), None, None);
    assert!(state.running.get("orders:GET:/orders").blocked);

    state.registry.delete("orders");
    eventually(|| state.running.list().is_empty()).await;
    assert!(!state.engine.route_exists(&RouteId::from_raw("orders:GET:/orders")));
}

#[tokio::test]
async fn redeploy_keeps_running_state() {
    let (state, _) = gateway_with(None);
    let api = ApiDefinition::new("orders", "http://orders")
        .with_path(PathSpec::new(HttpMethod::Get, "/orders"));
    state.registry.put(api.clone()).unwrap();
    eventually(|| state.engine.len() == 1).await;

    state
        .running
        .upsert("orders:GET:/orders", &|s| s.suspension_message = Some("maintenance".into()))
        .unwrap();

    state.registry.put(api.with_path(PathSpec::new(HttpMethod::Post, "/orders"))).unwrap();
    eventually(|| state.engine.len() == 2).await;
    assert_eq!(
        state.running.get("orders:GET:/orders").suspension_message.as_deref(),
        Some("maintenance")
    );
}
