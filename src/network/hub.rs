//! Hub - live sessions, rooms and message dispatch.
//!
//! The hub is the transport side of the broker. It knows nothing about roles
//! beyond what the [`SessionHooks`] tell it: the hooks authenticate a new
//! session, authorize each message, handle it, and clean up when the session
//! goes away.

use crate::error::{DispatchError, HandlerError, HandshakeError};
use crate::network::session::{Inbound, Outbound, Session};
use crate::state::{SessionId, SessionIdGenerator};
use crate::telemetry::{DispatchTimer, spans};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use sharecast_proto::Frame;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info};

/// Callbacks the hub invokes over a session's life.
#[async_trait]
pub trait SessionHooks: Send + Sync {
    /// Authenticate a new session. On success the session carries its role.
    async fn accept(&self, hub: &Arc<Hub>, session: &Arc<Session>) -> Result<(), HandshakeError>;

    /// Authorize an event or RPC name before dispatch.
    fn before_dispatch(&self, session: &Session, name: &str) -> Result<(), DispatchError>;

    /// Handle an authorized event.
    async fn event(
        &self,
        hub: &Arc<Hub>,
        session: &Arc<Session>,
        name: &str,
        payload: Value,
    ) -> Result<(), HandlerError>;

    /// Handle an authorized RPC.
    async fn rpc(
        &self,
        hub: &Arc<Hub>,
        session: &Arc<Session>,
        method: &str,
        params: Value,
    ) -> Result<Value, HandlerError>;

    /// Called exactly once per session, after it has been closed and removed.
    async fn session_lost(&self, hub: &Arc<Hub>, session: &Arc<Session>);
}

/// Per-session transport limits.
#[derive(Debug, Clone)]
pub struct HubSettings {
    pub node: String,
    pub handshake_timeout: Duration,
    pub outbound_queue: usize,
}

/// The channel ends a connection task drives for a new session.
pub struct SessionIo {
    pub session: Arc<Session>,
    pub outbound: mpsc::Receiver<Outbound>,
    pub inbound: mpsc::Sender<Inbound>,
}

pub struct Hub {
    sessions: DashMap<SessionId, Arc<Session>>,
    rooms: DashMap<String, HashSet<SessionId>>,
    ids: SessionIdGenerator,
    hooks: Arc<dyn SessionHooks>,
    settings: HubSettings,
}

impl Hub {
    pub fn new(settings: HubSettings, hooks: Arc<dyn SessionHooks>) -> Self {
        Self {
            sessions: DashMap::new(),
            rooms: DashMap::new(),
            ids: SessionIdGenerator::new(settings.node.clone()),
            hooks,
            settings,
        }
    }

    /// Create and register a session for a new connection.
    pub fn open_session(&self) -> SessionIo {
        let capacity = self.settings.outbound_queue.max(1);
        let (out_tx, out_rx) = mpsc::channel(capacity);
        let (in_tx, in_rx) = mpsc::channel(capacity);
        let session = Arc::new(Session::new(
            self.ids.next(),
            out_tx,
            in_rx,
            self.settings.handshake_timeout,
        ));
        self.sessions.insert(session.id().clone(), Arc::clone(&session));
        SessionIo {
            session,
            outbound: out_rx,
            inbound: in_tx,
        }
    }

    /// Run the accept hook.
    pub async fn accept(self: &Arc<Self>, session: &Arc<Session>) -> Result<(), HandshakeError> {
        self.hooks.accept(self, session).await
    }

    /// Authorize and dispatch one post-handshake frame.
    ///
    /// Rejected events are dropped; rejected RPCs get an error reply. The
    /// session stays open either way.
    pub async fn dispatch(self: &Arc<Self>, session: &Arc<Session>, frame: Frame) {
        match frame {
            Frame::Event { event, payload } => {
                if let Err(e) = self.hooks.before_dispatch(session, &event) {
                    debug!(event = %event, error = %e, "Event rejected");
                    return;
                }
                let _timer = DispatchTimer::new(&event);
                let result = self
                    .hooks
                    .event(self, session, &event, payload)
                    .instrument(spans::dispatch(&event, session.id()))
                    .await;
                if let Err(e) = result {
                    debug!(event = %event, code = e.error_code(), error = %e, "Event failed");
                }
            }
            Frame::Rpc { id, method, params } => {
                let reply = match self.hooks.before_dispatch(session, &method) {
                    Err(e) => {
                        debug!(method = %method, error = %e, "RPC rejected");
                        Frame::err(id, e.error_code())
                    }
                    Ok(()) => {
                        let _timer = DispatchTimer::new(&method);
                        let result = self
                            .hooks
                            .rpc(self, session, &method, params)
                            .instrument(spans::dispatch(&method, session.id()))
                            .await;
                        match result {
                            Ok(value) => Frame::ok(id, value),
                            Err(e) => {
                                debug!(method = %method, code = e.error_code(), error = %e, "RPC failed");
                                Frame::err(id, e.error_code())
                            }
                        }
                    }
                };
                session.send(reply);
            }
            Frame::Reply { id, .. } => {
                debug!(id, "Ignoring reply frame from client");
            }
        }
    }

    /// Add `session` to `room`.
    pub fn join(&self, session: &Session, room: &str) {
        session.record_room(room);
        self.rooms
            .entry(room.to_string())
            .or_default()
            .insert(session.id().clone());
    }

    /// Emit an event to every live member of `room`. Returns how many were
    /// queued.
    pub fn broadcast(&self, room: &str, event: &str, payload: impl Into<Value>) -> usize {
        let members: Vec<SessionId> = match self.rooms.get(room) {
            Some(members) => members.iter().cloned().collect(),
            None => return 0,
        };
        let payload = payload.into();
        members
            .iter()
            .filter_map(|id| self.session(id))
            .filter(|s| s.emit(event, payload.clone()))
            .count()
    }

    /// Forcibly terminate a session. The peer receives a close frame.
    pub fn remove_session(&self, id: &str) -> bool {
        match self.sessions.remove(id) {
            Some((_, session)) => {
                info!(session = %id, "Session removed");
                session.close();
                true
            }
            None => false,
        }
    }

    pub fn session(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.get(id).map(|s| Arc::clone(s.value()))
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Members of `room`, unordered.
    #[cfg(test)]
    pub fn room_members(&self, room: &str) -> Vec<SessionId> {
        self.rooms
            .get(room)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Tear down a finished session and run the lost hook once.
    pub async fn teardown(self: &Arc<Self>, session: &Arc<Session>) {
        if !session.mark_lost() {
            return;
        }
        session.close();
        self.sessions
            .remove_if(session.id(), |_, stored| Arc::ptr_eq(stored, session));
        for room in session.rooms() {
            if let Some(mut members) = self.rooms.get_mut(&room) {
                members.remove(session.id());
            }
            self.rooms.remove_if(&room, |_, members| members.is_empty());
        }
        self.hooks.session_lost(self, session).await;
    }
}
