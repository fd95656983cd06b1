//! User registry, keyed by session id.
//!
//! Users are created by a successful user handshake and removed when their
//! session is lost.

use crate::network::Session;
use crate::state::{SessionId, User};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Tracks connected viewers.
#[derive(Debug, Default)]
pub struct UserManager {
    users: DashMap<SessionId, Arc<User>>,
    /// Highest concurrent user count seen.
    peak: AtomicUsize,
}

impl UserManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store the user for `session`.
    pub fn register(&self, session: &Arc<Session>) -> Arc<User> {
        let user = Arc::new(User::new(session));
        self.users.insert(session.id().clone(), Arc::clone(&user));
        self.peak.fetch_max(self.users.len(), Ordering::Relaxed);
        user
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<User>> {
        self.users.get(session_id).map(|u| Arc::clone(u.value()))
    }

    /// Remove only if the stored user is `user` (by pointer).
    pub fn remove(&self, user: &Arc<User>) -> bool {
        self.users
            .remove_if(user.session_id(), |_, stored| Arc::ptr_eq(stored, user))
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}
