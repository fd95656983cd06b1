//! Handler context and traits.
//!
//! Defines the `Context<'a>` struct passed to every event and RPC handler,
//! and the two handler traits the registry stores.

use crate::error::HandlerError;
use crate::network::{Hub, Session};
use crate::state::{Broker, Host, Role, Slave, User};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Result type for handlers.
pub type HandlerResult<T = ()> = Result<T, HandlerError>;

/// Handler context passed to each handler.
pub struct Context<'a> {
    /// Sessions and rooms.
    pub hub: &'a Arc<Hub>,
    /// Shared broker state.
    pub broker: &'a Arc<Broker>,
    /// The session the message arrived on.
    pub session: &'a Arc<Session>,
}

impl Context<'_> {
    /// The calling user. Fails for any other role.
    pub fn user(&self) -> HandlerResult<&Arc<User>> {
        match self.session.role() {
            Some(Role::User(user)) => Ok(user),
            _ => Err(HandlerError::WrongRole),
        }
    }

    /// The calling host. Fails for any other role.
    pub fn host(&self) -> HandlerResult<&Arc<Host>> {
        match self.session.role() {
            Some(Role::Host(host)) => Ok(host),
            _ => Err(HandlerError::WrongRole),
        }
    }

    /// The calling slave. Fails for any other role.
    pub fn slave(&self) -> HandlerResult<&Arc<Slave>> {
        match self.session.role() {
            Some(Role::Slave(slave)) => Ok(slave),
            _ => Err(HandlerError::WrongRole),
        }
    }
}

/// Handler for a fire-and-forget event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, ctx: &Context<'_>, payload: Value) -> HandlerResult;
}

/// Handler for an RPC; the returned value becomes the reply result.
#[async_trait]
pub trait RpcHandler: Send + Sync {
    async fn call(&self, ctx: &Context<'_>, params: Value) -> HandlerResult<Value>;
}
