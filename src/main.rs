//! sharecastd - Sharecast session broker.
//!
//! Authenticates hosts, slaves and viewers over WebSocket and admits viewers
//! to idle slaves in arrival order.

mod config;
mod error;
mod handlers;
mod http;
mod network;
mod state;
mod telemetry;

#[cfg(test)]
mod testing;

use crate::config::Config;
use crate::network::{Gateway, HubSettings};
use axum::Router;
use std::net::SocketAddr;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sharecastd.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s) in {}",
            errors.len(),
            config_path
        ));
    }

    info!(
        node = %config.server.node,
        hosts = config.hosts.len(),
        "Starting sharecastd"
    );

    let gateway = Gateway::new(
        config.server.ws_path.clone(),
        HubSettings {
            node: config.server.node.clone(),
            handshake_timeout: config.timeouts.handshake(),
            outbound_queue: config.limits.outbound_queue,
        },
    );
    let router = gateway.init(Router::new(), config.host_secrets());
    let mounted = gateway
        .mounted()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("gateway failed to initialize"))?;

    // Provision configured slaves
    for host in &config.hosts {
        for slave in &host.slaves {
            match mounted.broker.slaves.provision(&host.name, slave) {
                Ok(_) => info!(host = %host.name, slave = %slave, "Slave provisioned"),
                Err(e) => warn!(host = %host.name, slave = %slave, error = %e, "Slave not provisioned"),
            }
        }
    }

    let app = router.merge(http::status_router(&config.server.status_path, &mounted));

    let listener = tokio::net::TcpListener::bind(config.server.listen).await?;
    let addr = listener.local_addr()?;
    info!(%addr, ws = %config.server.ws_path, status = %config.server.status_path, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
