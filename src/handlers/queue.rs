//! Admission queue handlers (user namespace).
//!
//! - `user.queue.join` (RPC): take a place in line, reply `{ticket, order}`
//! - `user.queue.state` (RPC): `{ticket}` -> `{order, ahead, in_service}`
//! - `user.queue.leave` (event): give up the place

use super::core::{Context, EventHandler, HandlerResult, RpcHandler};
use crate::error::HandlerError;
use crate::handlers::admission;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use subtle::ConstantTimeEq;
use tracing::{debug, info};

pub struct QueueJoinHandler;

#[async_trait]
impl RpcHandler for QueueJoinHandler {
    async fn call(&self, ctx: &Context<'_>, _params: Value) -> HandlerResult<Value> {
        let user = ctx.user()?;
        if user.is_paired() {
            return Err(HandlerError::AlreadyServing);
        }
        let (wait, created) = user.enqueue(&ctx.broker.queue);
        if created {
            info!(order = wait.order, "Joined admission queue");
        }
        admission::run(ctx.broker);
        Ok(json!({ "ticket": wait.ticket, "order": wait.order }))
    }
}

#[derive(Debug, Deserialize)]
struct StateParams {
    ticket: String,
}

pub struct QueueStateHandler;

#[async_trait]
impl RpcHandler for QueueStateHandler {
    async fn call(&self, ctx: &Context<'_>, params: Value) -> HandlerResult<Value> {
        let params: StateParams = serde_json::from_value(params)?;
        let user = ctx.user()?;
        let wait = user.wait_state().ok_or(HandlerError::NotQueued)?;
        if !bool::from(wait.ticket.as_bytes().ct_eq(params.ticket.as_bytes())) {
            return Err(HandlerError::TicketMismatch);
        }
        let queue = &ctx.broker.queue;
        Ok(json!({
            "order": wait.order,
            "ahead": queue.ahead_of(wait.order),
            "in_service": queue.last_in_service(),
        }))
    }
}

pub struct QueueLeaveHandler;

#[async_trait]
impl EventHandler for QueueLeaveHandler {
    async fn handle(&self, ctx: &Context<'_>, _payload: Value) -> HandlerResult {
        let user = ctx.user()?;
        let wait = user.dequeue(&ctx.broker.queue).ok_or(HandlerError::NotQueued)?;
        debug!(order = wait.order, "Left admission queue");
        Ok(())
    }
}
