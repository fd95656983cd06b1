//! Core handler infrastructure.
//!
//! This module contains the handler registry and the context and trait types
//! shared by every event and RPC handler.

pub mod context;
pub mod registry;

pub use context::{Context, EventHandler, HandlerResult, RpcHandler};
pub use registry::Registry;
