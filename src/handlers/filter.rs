//! Authorization filter for post-handshake messages.
//!
//! A session may only send events and RPCs named under its own role:
//! `user.*`, `host.*` or `slave.*`. Roles never change after the handshake,
//! so neither does what a session may send.

use crate::error::DispatchError;
use crate::network::Session;

/// Permit `name` only if its leading segment is the session's role.
pub fn authorize(session: &Session, name: &str) -> Result<(), DispatchError> {
    let role = session.role().ok_or(DispatchError::Unauthenticated)?.role_name();
    if role.owns(name) {
        Ok(())
    } else {
        Err(DispatchError::Forbidden {
            role,
            name: name.to_string(),
        })
    }
}
