//! Handler registry and dispatch.
//!
//! The `Registry` maps event and RPC names to handlers and keeps per-name
//! usage counters.

use super::context::{Context, EventHandler, HandlerResult, RpcHandler};
use crate::error::DispatchError;
use crate::handlers::host::{SlaveListHandler, SlaveProvisionHandler};
use crate::handlers::queue::{QueueJoinHandler, QueueLeaveHandler, QueueStateHandler};
use crate::handlers::slave::{SessionEndHandler, StatusHandler};
use serde_json::Value;
use sharecast_proto::names::{inbound, rpc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Registry of event and RPC handlers.
pub struct Registry {
    events: HashMap<&'static str, Box<dyn EventHandler>>,
    rpcs: HashMap<&'static str, Box<dyn RpcHandler>>,
    /// Dispatch counters, one per registered name.
    counts: HashMap<&'static str, AtomicU64>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut events: HashMap<&'static str, Box<dyn EventHandler>> = HashMap::new();
        let mut rpcs: HashMap<&'static str, Box<dyn RpcHandler>> = HashMap::new();

        // User namespace
        rpcs.insert(rpc::USER_QUEUE_JOIN, Box::new(QueueJoinHandler));
        rpcs.insert(rpc::USER_QUEUE_STATE, Box::new(QueueStateHandler));
        events.insert(inbound::USER_QUEUE_LEAVE, Box::new(QueueLeaveHandler));

        // Host namespace
        rpcs.insert(rpc::HOST_SLAVE_PROVISION, Box::new(SlaveProvisionHandler));
        rpcs.insert(rpc::HOST_SLAVE_LIST, Box::new(SlaveListHandler));

        // Slave namespace
        events.insert(inbound::SLAVE_SESSION_END, Box::new(SessionEndHandler));
        rpcs.insert(rpc::SLAVE_STATUS, Box::new(StatusHandler));

        let counts = events
            .keys()
            .chain(rpcs.keys())
            .map(|&name| (name, AtomicU64::new(0)))
            .collect();

        Self {
            events,
            rpcs,
            counts,
        }
    }

    fn count(&self, name: &str) {
        if let Some(counter) = self.counts.get(name) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Dispatch an event to its handler.
    pub async fn dispatch_event(&self, ctx: &Context<'_>, name: &str, payload: Value) -> HandlerResult {
        let Some(handler) = self.events.get(name) else {
            debug!(event = %name, "No handler for event");
            return Err(DispatchError::UnknownHandler(name.to_string()).into());
        };
        self.count(name);
        handler.handle(ctx, payload).await
    }

    /// Dispatch an RPC to its handler.
    pub async fn dispatch_rpc(&self, ctx: &Context<'_>, name: &str, params: Value) -> HandlerResult<Value> {
        let Some(handler) = self.rpcs.get(name) else {
            debug!(method = %name, "No handler for RPC");
            return Err(DispatchError::UnknownHandler(name.to_string()).into());
        };
        self.count(name);
        handler.call(ctx, params).await
    }

    /// Usage statistics, most used first. Unused names are omitted.
    pub fn usage(&self) -> Vec<(&'static str, u64)> {
        let mut stats: Vec<_> = self
            .counts
            .iter()
            .map(|(name, count)| (*name, count.load(Ordering::Relaxed)))
            .filter(|(_, count)| *count > 0)
            .collect();
        stats.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        stats
    }

    /// Every registered name, sorted.
    #[cfg(test)]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.counts.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
