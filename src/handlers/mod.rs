//! Broker handlers.
//!
//! This module plugs the broker into the hub: handshake verification on
//! accept, the namespace filter before every dispatch, event and RPC
//! handlers, and session-lost cleanup.

mod admission;
pub mod core;
mod filter;
mod handshake;
mod host;
mod lifecycle;
mod queue;
mod slave;

pub use core::{Context, Registry};

use crate::error::{DispatchError, HandlerError, HandshakeError};
use crate::network::{Hub, Session, SessionHooks};
use crate::state::Broker;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Session hooks backed by the broker state and handler registry.
pub struct BrokerHooks {
    broker: Arc<Broker>,
    registry: Registry,
}

impl BrokerHooks {
    pub fn new(broker: Arc<Broker>) -> Self {
        Self {
            broker,
            registry: Registry::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[async_trait]
impl SessionHooks for BrokerHooks {
    async fn accept(&self, hub: &Arc<Hub>, session: &Arc<Session>) -> Result<(), HandshakeError> {
        handshake::verify(hub, &self.broker, session).await
    }

    fn before_dispatch(&self, session: &Session, name: &str) -> Result<(), DispatchError> {
        filter::authorize(session, name)
    }

    async fn event(
        &self,
        hub: &Arc<Hub>,
        session: &Arc<Session>,
        name: &str,
        payload: Value,
    ) -> Result<(), HandlerError> {
        let ctx = Context {
            hub,
            broker: &self.broker,
            session,
        };
        self.registry.dispatch_event(&ctx, name, payload).await
    }

    async fn rpc(
        &self,
        hub: &Arc<Hub>,
        session: &Arc<Session>,
        method: &str,
        params: Value,
    ) -> Result<Value, HandlerError> {
        let ctx = Context {
            hub,
            broker: &self.broker,
            session,
        };
        self.registry.dispatch_rpc(&ctx, method, params).await
    }

    async fn session_lost(&self, hub: &Arc<Hub>, session: &Arc<Session>) {
        lifecycle::session_lost(hub, &self.broker, session);
    }
}
