//! Session - the broker's handle on one WebSocket connection.
//!
//! A `Session` is owned by its connection task and shared (via `Arc`) with the
//! hub and with role objects. It carries:
//! - a bounded outbound queue drained by the connection's writer task
//! - an inbound queue fed by the connection's reader task
//! - a write-once role slot filled by a successful handshake
//! - the record of rooms it has joined
//! - a close signal observed by both connection halves

use crate::state::{Role, SessionId};
use parking_lot::Mutex;
use serde_json::Value;
use sharecast_proto::Frame;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A decoded inbound message, or the JSON error that prevented decoding.
pub type Inbound = Result<Value, serde_json::Error>;

/// Items queued for the writer task.
#[derive(Debug)]
pub enum Outbound {
    Frame(Frame),
    /// Send a close frame and stop writing.
    Close,
}

/// Errors from [`Session::read`].
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("timed out after {0:?} waiting for message")]
    Timeout(Duration),
    #[error("session closed")]
    Closed,
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub struct Session {
    id: SessionId,
    outbound: mpsc::Sender<Outbound>,
    inbound: tokio::sync::Mutex<mpsc::Receiver<Inbound>>,
    rooms: Mutex<BTreeSet<String>>,
    role: OnceLock<Role>,
    closed: CancellationToken,
    lost: AtomicBool,
    read_timeout: Duration,
}

impl Session {
    pub fn new(
        id: SessionId,
        outbound: mpsc::Sender<Outbound>,
        inbound: mpsc::Receiver<Inbound>,
        read_timeout: Duration,
    ) -> Self {
        Self {
            id,
            outbound,
            inbound: tokio::sync::Mutex::new(inbound),
            rooms: Mutex::new(BTreeSet::new()),
            role: OnceLock::new(),
            closed: CancellationToken::new(),
            lost: AtomicBool::new(false),
            read_timeout,
        }
    }

    #[inline]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Wait for the next inbound message, bounded by the handshake timeout.
    pub async fn read(&self) -> Result<Value, ReadError> {
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            _ = self.closed.cancelled() => Err(ReadError::Closed),
            received = tokio::time::timeout(self.read_timeout, inbound.recv()) => match received {
                Err(_) => Err(ReadError::Timeout(self.read_timeout)),
                Ok(None) => Err(ReadError::Closed),
                Ok(Some(msg)) => Ok(msg?),
            },
        }
    }

    /// Wait for the next inbound message with no deadline.
    ///
    /// Returns `None` once the session is closed or the reader has stopped.
    pub async fn next_message(&self) -> Option<Inbound> {
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => None,
            msg = inbound.recv() => msg,
        }
    }

    /// Fire-and-forget event to the peer.
    ///
    /// Returns `false` if the frame was dropped (session closed or its queue full).
    pub fn emit(&self, event: &str, payload: impl Into<Value>) -> bool {
        self.send(Frame::event(event, payload))
    }

    /// Queue a frame for the peer without waiting.
    pub fn send(&self, frame: Frame) -> bool {
        if self.closed.is_cancelled() {
            debug!(session = %self.id, "Dropping frame for closed session");
            return false;
        }
        match self.outbound.try_send(Outbound::Frame(frame)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(session = %self.id, "Outbound queue full - frame dropped");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Rooms this session has joined, in name order.
    ///
    /// The record survives teardown so leave handling can still see it.
    pub fn rooms(&self) -> Vec<String> {
        self.rooms.lock().iter().cloned().collect()
    }

    pub(crate) fn record_room(&self, room: &str) -> bool {
        self.rooms.lock().insert(room.to_string())
    }

    /// The role attached by the handshake, if any.
    #[inline]
    pub fn role(&self) -> Option<&Role> {
        self.role.get()
    }

    /// Attach the role. Fails (returning the role back) if one is already set.
    pub fn attach(&self, role: Role) -> Result<(), Role> {
        self.role.set(role)
    }

    /// Close the session: readers stop, the writer sends a close frame.
    ///
    /// Idempotent.
    pub fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();
        let _ = self.outbound.try_send(Outbound::Close);
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    /// Mark the session as lost. True only for the first call.
    pub(crate) fn mark_lost(&self) -> bool {
        !self.lost.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn close_token(&self) -> CancellationToken {
        self.closed.clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("role", &self.role.get().map(Role::role_name))
            .field("closed", &self.closed.is_cancelled())
            .finish()
    }
}
