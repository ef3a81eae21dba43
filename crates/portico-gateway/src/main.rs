//! Portico gateway entry point.
//!
//! Configuration is read from the file named by `PORTICO_CONFIG` (optional)
//! and `PORTICO_*` environment variables; see
//! [`GatewayServerConfig`](portico_gateway::config::GatewayServerConfig).
//! `RUST_LOG` refines the log filter.

use portico_gateway::config::{GatewayServerConfig, LogFormat};
use portico_gateway::keys::KeySet;
use portico_gateway::server::GatewayServer;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("portico_gateway=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() {
    let config = match GatewayServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Portico configuration error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    let keys = match &config.jwks_path {
        Some(path) => match KeySet::from_file(path) {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(error = %e, "failed to load verification keys");
                std::process::exit(1);
            }
        },
        None => {
            warn!("jwks_path is not set: every bearer token will be rejected");
            KeySet::empty()
        }
    };

    info!(
        addr = %config.listen_addr(),
        default_rate_per_second = config.default_rate_per_second,
        default_burst = config.default_burst,
        "Portico configuration loaded"
    );

    if let Err(e) = GatewayServer::new(config, Arc::new(keys)).start().await {
        tracing::error!(error = %e, "gateway stopped");
        std::process::exit(1);
    }
}
