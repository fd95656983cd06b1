//! Slave management handlers (host namespace).

use super::core::{Context, HandlerResult, RpcHandler};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

#[derive(Debug, Deserialize)]
struct ProvisionParams {
    slave_name: String,
}

/// `host.slave.provision {slave_name}` - register a slave under the caller.
pub struct SlaveProvisionHandler;

#[async_trait]
impl RpcHandler for SlaveProvisionHandler {
    async fn call(&self, ctx: &Context<'_>, params: Value) -> HandlerResult<Value> {
        let params: ProvisionParams = serde_json::from_value(params)?;
        let host = ctx.host()?;
        let slave = ctx.broker.slaves.provision(host.name(), &params.slave_name)?;
        info!(host = %host.name(), slave = %slave.name(), "Slave provisioned");
        Ok(json!({ "slave_name": slave.name(), "online": slave.is_online() }))
    }
}

/// `host.slave.list` - the caller's slaves with their status.
pub struct SlaveListHandler;

#[async_trait]
impl RpcHandler for SlaveListHandler {
    async fn call(&self, ctx: &Context<'_>, _params: Value) -> HandlerResult<Value> {
        let host = ctx.host()?;
        let slaves: Vec<Value> = ctx
            .broker
            .slaves
            .for_host(host.name())
            .iter()
            .map(|slave| {
                json!({
                    "slave_name": slave.name(),
                    "online": slave.is_online(),
                    "serving": slave.is_serving(),
                })
            })
            .collect();
        Ok(Value::Array(slaves))
    }
}
