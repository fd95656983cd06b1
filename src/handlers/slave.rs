//! Slave handlers (slave namespace).

use super::core::{Context, EventHandler, HandlerResult, RpcHandler};
use crate::handlers::admission;
use async_trait::async_trait;
use serde_json::{Value, json};
use sharecast_proto::names::event;
use tracing::{debug, info};

/// `slave.session.end` - the slave finished serving its viewer.
///
/// The viewer is told with `viewing.end` and the slave becomes available to
/// the next waiter.
pub struct SessionEndHandler;

#[async_trait]
impl EventHandler for SessionEndHandler {
    async fn handle(&self, ctx: &Context<'_>, _payload: Value) -> HandlerResult {
        let slave = ctx.slave()?;
        if slave.session().is_none_or(|current| current.id() != ctx.session.id()) {
            debug!(slave = %slave.name(), "Session end from superseded connection ignored");
            return Ok(());
        }
        match slave.end_viewing(&ctx.broker.users) {
            Some(viewer) => {
                info!(slave = %slave.name(), viewer = %viewer.id(), "Viewing ended");
                viewer.emit(event::VIEWING_END, slave.name());
            }
            None => debug!(slave = %slave.name(), "Session end with no viewer"),
        }
        admission::run(ctx.broker);
        Ok(())
    }
}

/// `slave.status` - the calling slave's name and pairing.
pub struct StatusHandler;

#[async_trait]
impl RpcHandler for StatusHandler {
    async fn call(&self, ctx: &Context<'_>, _params: Value) -> HandlerResult<Value> {
        let slave = ctx.slave()?;
        let viewer = slave.viewer().map(|v| v.id().clone());
        Ok(json!({ "slave_name": slave.name(), "serving": viewer.is_some(), "viewer": viewer }))
    }
}
