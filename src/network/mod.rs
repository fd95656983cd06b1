//! Network module.
//!
//! Contains the Gateway (route mounting), Connection driver, Hub (sessions,
//! rooms, dispatch) and the Session handle.

mod connection;
mod gateway;
mod hub;
mod session;

pub use gateway::{Gateway, Mounted};
pub use hub::{Hub, HubSettings, SessionHooks};
pub use session::{ReadError, Session};
#[cfg(test)]
pub use session::{Inbound, Outbound};
