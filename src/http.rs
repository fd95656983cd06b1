//! HTTP status endpoint.
//!
//! Serves a JSON snapshot of the broker's registries and queue counters next
//! to the WebSocket endpoint.

use crate::handlers::BrokerHooks;
use crate::network::{Hub, Mounted};
use crate::state::{Broker, BrokerStats};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Clone)]
struct StatusState {
    hub: Arc<Hub>,
    broker: Arc<Broker>,
    hooks: Arc<BrokerHooks>,
}

/// Body of `GET <status_path>`.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    #[serde(flatten)]
    pub stats: BrokerStats,
    /// Dispatch counts per event/RPC name.
    pub dispatched: BTreeMap<&'static str, u64>,
}

/// Handler for GET status - returns the current status report.
async fn status_handler(State(state): State<StatusState>) -> Json<StatusReport> {
    Json(StatusReport {
        stats: state.broker.stats(state.hub.session_count()),
        dispatched: state.hooks.registry().usage().into_iter().collect(),
    })
}

/// Router serving the status endpoint at `path`.
pub fn status_router(path: &str, mounted: &Mounted) -> Router {
    let state = StatusState {
        hub: Arc::clone(&mounted.hub),
        broker: Arc::clone(&mounted.broker),
        hooks: Arc::clone(&mounted.hooks),
    };
    Router::new().route(path, get(status_handler)).with_state(state)
}
