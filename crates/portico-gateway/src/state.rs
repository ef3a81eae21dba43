//! Shared application state.

use crate::backend::UpstreamProxy;
use crate::config::GatewayServerConfig;
use crate::descriptor::OpenApiResolver;
use crate::engine::InMemoryRouteEngine;
use crate::error::{GatewayResult, GatewayRuntimeError};
use crate::filter::{AuthorizationGate, FilterPipeline, LoggingFilter, ThrottleFilter};
use crate::keys::KeySet;
use crate::registry::{InMemoryApiRegistry, spawn_listener};
use crate::running::InMemoryRunningApiStore;
use crate::surface::ErrorSurface;
use crate::sync::RegistrySync;
use portico_kernel::gateway::{DescriptorResolver, GatewayFilter, ThrottlingPolicy};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InMemoryRouteEngine>,
    pub registry: Arc<InMemoryApiRegistry>,
    pub running: Arc<InMemoryRunningApiStore>,
    pub sync: Arc<RegistrySync>,
    pub keys: Arc<KeySet>,
    pub pipeline: Arc<FilterPipeline>,
    pub proxy: Arc<UpstreamProxy>,
    pub surface: Arc<ErrorSurface>,
}

impl AppState {
    /// Wire every component, resolving descriptors over HTTP.
    pub fn build(config: &GatewayServerConfig, keys: Arc<KeySet>) -> GatewayResult<Self> {
        let resolver = OpenApiResolver::new(config.upstream_timeout())
            .map_err(|e| GatewayRuntimeError::Internal(e.to_string()))?;
        Self::with_resolver(config, keys, Arc::new(resolver))
    }

    /// Wire every component around the given descriptor resolver.
    pub fn with_resolver(
        config: &GatewayServerConfig,
        keys: Arc<KeySet>,
        resolver: Arc<dyn DescriptorResolver>,
    ) -> GatewayResult<Self> {
        let engine = Arc::new(InMemoryRouteEngine::new());
        let running = Arc::new(InMemoryRunningApiStore::new());
        let sync = Arc::new(RegistrySync::new(engine.clone(), resolver, running.clone()));

        let defaults =
            ThrottlingPolicy::new(config.default_rate_per_second, config.default_burst);
        let filters: Vec<Arc<dyn GatewayFilter>> = vec![
            Arc::new(AuthorizationGate::new(keys.clone())),
            Arc::new(ThrottleFilter::new(defaults, running.clone(), engine.clone())),
            Arc::new(LoggingFilter::new()),
        ];

        let proxy = UpstreamProxy::new(config.upstream_timeout())
            .map_err(|e| GatewayRuntimeError::Internal(e.to_string()))?;

        Ok(Self {
            engine,
            registry: Arc::new(InMemoryApiRegistry::new()),
            surface: Arc::new(ErrorSurface::new(running.clone())),
            running,
            sync,
            keys,
            pipeline: Arc::new(FilterPipeline::new(filters)),
            proxy: Arc::new(proxy),
        })
    }

    /// Start applying registry notifications to the route table.
    pub fn start_sync(&self) -> JoinHandle<()> {
        spawn_listener(self.sync.clone(), self.registry.subscribe())
    }
}
