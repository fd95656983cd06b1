//! Host registry.
//!
//! At most one live session may hold a host name. The occupancy check and the
//! insert happen under one write lock, so of two simultaneous registrations
//! for the same name exactly one wins.

use crate::network::Session;
use crate::state::{Host, SessionId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Tracks which session holds each host name.
#[derive(Debug, Default)]
pub struct HostManager {
    hosts: RwLock<HashMap<String, Arc<Host>>>,
}

impl HostManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` for `session`.
    ///
    /// `attach` runs under the write lock with the new host so the role is
    /// bound to the session before anyone can observe the entry. On conflict
    /// returns the holder's session id.
    pub fn register<F>(&self, name: &str, session: &Session, attach: F) -> Result<Arc<Host>, SessionId>
    where
        F: FnOnce(&Arc<Host>),
    {
        let mut hosts = self.hosts.write();
        if let Some(holder) = hosts.get(name) {
            return Err(holder.session_id().clone());
        }
        let host = Arc::new(Host::new(name.to_string(), session.id().clone()));
        attach(&host);
        hosts.insert(name.to_string(), Arc::clone(&host));
        Ok(host)
    }

    /// Remove `name` if `session_id` still holds it.
    pub fn remove(&self, name: &str, session_id: &SessionId) -> bool {
        let mut hosts = self.hosts.write();
        if hosts.get(name).is_some_and(|h| h.session_id() == session_id) {
            hosts.remove(name);
            true
        } else {
            false
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Host>> {
        self.hosts.read().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.hosts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.read().is_empty()
    }
}
