//! Role objects attached to authenticated sessions.
//!
//! A session carries exactly one [`Role`] after a successful handshake. Hosts
//! and users live as long as their session; a [`Slave`] is provisioned ahead
//! of time and outlives any single connection, so its session and viewer
//! references sit behind a per-slave lock.
//!
//! # Lock Order
//!
//! `Slave::state` may be held while taking the admission queue lock, the user
//! map shard lock, or a user's `wait`/`slave` slots. Nothing takes a slave lock
//! while holding any of those.

use crate::network::Session;
use crate::state::SessionId;
use crate::state::managers::queue::{AdmissionQueue, WaitState};
use crate::state::managers::user::UserManager;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sharecast_proto::RoleName;
use std::sync::{Arc, Weak};
use tracing::debug;

/// The identity a session authenticated as.
#[derive(Debug, Clone)]
pub enum Role {
    User(Arc<User>),
    Host(Arc<Host>),
    Slave(Arc<Slave>),
}

impl Role {
    pub fn role_name(&self) -> RoleName {
        match self {
            Role::User(_) => RoleName::User,
            Role::Host(_) => RoleName::Host,
            Role::Slave(_) => RoleName::Slave,
        }
    }
}

// ============================================================================
// User
// ============================================================================

/// A viewer.
#[derive(Debug)]
pub struct User {
    session_id: SessionId,
    session: Weak<Session>,
    wait: Mutex<Option<Arc<WaitState>>>,
    slave: Mutex<Option<Arc<Slave>>>,
}

impl User {
    pub fn new(session: &Arc<Session>) -> Self {
        Self {
            session_id: session.id().clone(),
            session: Arc::downgrade(session),
            wait: Mutex::new(None),
            slave: Mutex::new(None),
        }
    }

    #[inline]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.upgrade()
    }

    /// Current queue position, if waiting.
    pub fn wait_state(&self) -> Option<Arc<WaitState>> {
        self.wait.lock().clone()
    }

    /// Enqueue unless already waiting. Returns the (possibly existing) state
    /// and whether it was newly created.
    pub fn enqueue(&self, queue: &AdmissionQueue) -> (Arc<WaitState>, bool) {
        let mut wait = self.wait.lock();
        if let Some(existing) = wait.as_ref() {
            return (Arc::clone(existing), false);
        }
        let state = queue.enqueue(&self.session_id, self.session.clone());
        *wait = Some(Arc::clone(&state));
        (state, true)
    }

    /// Leave the queue. The waiting-map entry is removed by order number and
    /// the reference cleared.
    pub fn dequeue(&self, queue: &AdmissionQueue) -> Option<Arc<WaitState>> {
        let mut wait = self.wait.lock();
        let state = wait.take()?;
        queue.remove(state.order);
        Some(state)
    }

    /// Clear the wait reference if it still points at `order`. Returns
    /// `false` when the user already left the queue.
    fn clear_wait_if(&self, order: i64) -> bool {
        let mut wait = self.wait.lock();
        if wait.as_ref().is_some_and(|w| w.order == order) {
            *wait = None;
            true
        } else {
            false
        }
    }

    /// The slave currently serving this user.
    pub fn slave(&self) -> Option<Arc<Slave>> {
        self.slave.lock().clone()
    }

    pub fn is_paired(&self) -> bool {
        self.slave.lock().is_some()
    }

    pub(crate) fn take_slave(&self) -> Option<Arc<Slave>> {
        self.slave.lock().take()
    }

    pub(crate) fn clear_slave_if(&self, slave: &Slave) {
        let mut current = self.slave.lock();
        if current.as_ref().is_some_and(|s| s.name == slave.name) {
            *current = None;
        }
    }
}

// ============================================================================
// Host
// ============================================================================

/// A capture operator owning a namespace of slaves.
#[derive(Debug)]
pub struct Host {
    name: String,
    session_id: SessionId,
    registered_at: DateTime<Utc>,
}

impl Host {
    pub fn new(name: String, session_id: SessionId) -> Self {
        Self {
            name,
            session_id,
            registered_at: Utc::now(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }
}

// ============================================================================
// Slave
// ============================================================================

#[derive(Debug, Default)]
struct SlaveState {
    session: Option<Arc<Session>>,
    viewer: Option<Arc<Session>>,
}

/// A broadcasting endpoint. Persists across reconnects.
#[derive(Debug)]
pub struct Slave {
    name: String,
    host: String,
    state: Mutex<SlaveState>,
}

/// A viewer paired with a slave by [`Slave::admit_from`].
#[derive(Debug)]
pub struct Admission {
    pub slave: String,
    pub slave_session: Arc<Session>,
    pub viewer: Arc<Session>,
    pub order: i64,
    pub enqueued_at: DateTime<Utc>,
}

/// What a matching slave disconnect released.
#[derive(Debug)]
pub struct SlaveRelease {
    pub viewer: Option<Arc<Session>>,
}

impl Slave {
    pub fn new(name: String, host: String) -> Self {
        Self {
            name,
            host,
            state: Mutex::new(SlaveState::default()),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the owning host.
    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.state.lock().session.clone()
    }

    pub fn viewer(&self) -> Option<Arc<Session>> {
        self.state.lock().viewer.clone()
    }

    /// True when a live session is attached.
    pub fn is_online(&self) -> bool {
        self.state
            .lock()
            .session
            .as_ref()
            .is_some_and(|s| !s.is_closed())
    }

    /// True when a viewer is paired.
    pub fn is_serving(&self) -> bool {
        self.state.lock().viewer.is_some()
    }

    /// Attach `session`, superseding any live one.
    ///
    /// The previous session is handed to `supersede` (which must terminate it)
    /// before the new one is stored, all under the slave lock. A paired viewer
    /// is kept.
    pub fn attach_session<F>(&self, session: Arc<Session>, supersede: F)
    where
        F: FnOnce(&Arc<Session>),
    {
        let mut state = self.state.lock();
        if let Some(old) = state.session.take()
            && old.id() != session.id()
            && !old.is_closed()
        {
            supersede(&old);
        }
        state.session = Some(session);
    }

    /// Detach if `session_id` is still the attached session.
    ///
    /// Returns `None` for a stale notification (already superseded or never
    /// attached); both references are cleared otherwise.
    pub fn release_if_current(&self, session_id: &SessionId) -> Option<SlaveRelease> {
        let mut state = self.state.lock();
        match state.session.as_ref() {
            Some(current) if current.id() == session_id => {
                state.session = None;
                Some(SlaveRelease {
                    viewer: state.viewer.take(),
                })
            }
            _ => {
                debug!(slave = %self.name, session = %session_id, "Stale slave notification dropped");
                None
            }
        }
    }

    /// Unpair `viewer_id` if it is the current viewer; returns the slave's
    /// session so it can be told.
    pub fn release_viewer_if(&self, viewer_id: &SessionId) -> Option<Option<Arc<Session>>> {
        let mut state = self.state.lock();
        if state.viewer.as_ref().is_some_and(|v| v.id() == viewer_id) {
            state.viewer = None;
            Some(state.session.clone())
        } else {
            None
        }
    }

    /// End the current viewing session. Returns the viewer that was paired.
    pub fn end_viewing(&self, users: &UserManager) -> Option<Arc<Session>> {
        let viewer = self.state.lock().viewer.take()?;
        if let Some(user) = users.get(viewer.id()) {
            user.clear_slave_if(self);
        }
        Some(viewer)
    }

    /// Pair this slave with the next waiter if it is idle.
    ///
    /// Under the slave lock: pop the smallest waiting order (advancing the
    /// in-service watermark), skip waiters whose session is gone, clear the
    /// admitted user's wait state and record the pairing on both sides.
    pub fn admit_from(
        self: &Arc<Self>,
        queue: &AdmissionQueue,
        users: &UserManager,
    ) -> Option<Admission> {
        let mut state = self.state.lock();
        let slave_session = match state.session.as_ref() {
            Some(s) if !s.is_closed() => Arc::clone(s),
            _ => return None,
        };
        if state.viewer.as_ref().is_some_and(|v| !v.is_closed()) {
            return None;
        }
        state.viewer = None;

        while let Some(waiter) = queue.pop_next() {
            let viewer = waiter.session().filter(|s| !s.is_closed());
            let user = users.get(&waiter.session_id);
            let (Some(viewer), Some(user)) = (viewer, user) else {
                debug!(order = waiter.order, session = %waiter.session_id, "Discarding closed waiter");
                continue;
            };
            if !user.clear_wait_if(waiter.order) {
                debug!(order = waiter.order, session = %waiter.session_id, "Waiter left before admission");
                continue;
            }
            *user.slave.lock() = Some(Arc::clone(self));
            state.viewer = Some(Arc::clone(&viewer));
            // A viewer closing from here on is unpaired by its own teardown.
            if viewer.is_closed() {
                debug!(order = waiter.order, session = %waiter.session_id, "Waiter closed during admission");
                user.clear_slave_if(self);
                state.viewer = None;
                continue;
            }
            return Some(Admission {
                slave: self.name.clone(),
                slave_session,
                viewer,
                order: waiter.order,
                enqueued_at: waiter.enqueued_at,
            });
        }
        None
    }
}
