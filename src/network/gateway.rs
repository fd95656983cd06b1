//! Gateway - mounts the broker on an HTTP router.
//!
//! The Gateway owns the hub and broker once initialized and exposes the
//! WebSocket upgrade route. Initialization happens once per gateway; later
//! calls leave the router untouched.

use crate::handlers::BrokerHooks;
use crate::network::connection;
use crate::network::{Hub, HubSettings};
use crate::state::Broker;
use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::routing::get;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Hub and broker, created together on first init.
#[derive(Clone)]
pub struct Mounted {
    pub hub: Arc<Hub>,
    pub broker: Arc<Broker>,
    pub hooks: Arc<BrokerHooks>,
}

pub struct Gateway {
    ws_path: String,
    settings: HubSettings,
    mounted: OnceLock<Mounted>,
}

impl Gateway {
    pub fn new(ws_path: impl Into<String>, settings: HubSettings) -> Self {
        Self {
            ws_path: ws_path.into(),
            settings,
            mounted: OnceLock::new(),
        }
    }

    /// Build the broker from `host_secrets` and mount the upgrade route.
    ///
    /// A second call is a no-op and returns `router` unchanged.
    pub fn init(&self, router: Router, host_secrets: HashMap<String, String>) -> Router {
        let mut created = false;
        let mounted = self.mounted.get_or_init(|| {
            created = true;
            let broker = Arc::new(Broker::new(host_secrets));
            let hooks = Arc::new(BrokerHooks::new(Arc::clone(&broker)));
            let hub = Arc::new(Hub::new(self.settings.clone(), hooks.clone()));
            Mounted { hub, broker, hooks }
        });
        if !created {
            debug!("Gateway already initialized");
            return router;
        }
        info!(path = %self.ws_path, "WebSocket endpoint mounted");
        router.route(
            &self.ws_path,
            get(upgrade).with_state(Arc::clone(&mounted.hub)),
        )
    }

    /// The hub and broker, once initialized.
    pub fn mounted(&self) -> Option<&Mounted> {
        self.mounted.get()
    }
}

async fn upgrade(
    State(hub): State<Arc<Hub>>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| connection::serve(hub, socket, remote))
}
