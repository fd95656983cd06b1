//! Test fixtures: in-memory peers, recording hooks and a broker fixture.

use crate::error::{DispatchError, HandlerError, HandshakeError};
use crate::handlers::{BrokerHooks, Context};
use crate::network::{Hub, HubSettings, Inbound, Outbound, Session, SessionHooks};
use crate::state::{Broker, SessionId};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use sharecast_proto::{Frame, RoleName};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const PEER_WAIT: Duration = Duration::from_secs(2);

/// The client side of an in-memory session.
#[derive(Debug)]
pub struct Peer {
    inbound: mpsc::Sender<Inbound>,
    outbound: mpsc::Receiver<Outbound>,
}

impl Peer {
    /// A session not registered with any hub.
    pub fn detached(id: &str, read_timeout: Duration) -> (Arc<Session>, Peer) {
        let (out_tx, out_rx) = mpsc::channel(64);
        let (in_tx, in_rx) = mpsc::channel(64);
        let session = Arc::new(Session::new(id.to_string(), out_tx, in_rx, read_timeout));
        (
            session,
            Peer {
                inbound: in_tx,
                outbound: out_rx,
            },
        )
    }

    /// A session opened on `hub`.
    pub fn attached(hub: &Hub) -> (Arc<Session>, Peer) {
        let io = hub.open_session();
        (
            io.session,
            Peer {
                inbound: io.inbound,
                outbound: io.outbound,
            },
        )
    }

    pub fn send(&self, value: Value) {
        self.inbound.try_send(Ok(value)).expect("inbound queue has room");
    }

    pub fn send_raw(&self, text: &str) {
        self.inbound
            .try_send(serde_json::from_str(text))
            .expect("inbound queue has room");
    }

    async fn next_item(&mut self) -> Option<Outbound> {
        tokio::time::timeout(PEER_WAIT, self.outbound.recv())
            .await
            .ok()
            .flatten()
    }

    pub fn try_next(&mut self) -> Option<Outbound> {
        self.outbound.try_recv().ok()
    }

    /// Next frame, or `None` on close or timeout.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        match self.next_item().await? {
            Outbound::Frame(frame) => Some(frame),
            Outbound::Close => None,
        }
    }

    /// Next frame as `(event, payload)`; `None` if it is not an event.
    pub async fn next_event(&mut self) -> Option<(String, Value)> {
        match self.next_frame().await? {
            Frame::Event { event, payload } => Some((event, payload)),
            _ => None,
        }
    }

    /// Skip events until one named `name` arrives.
    pub async fn next_event_named(&mut self, name: &str) -> Option<(String, Value)> {
        loop {
            let (event, payload) = self.next_event().await?;
            if event == name {
                return Some((event, payload));
            }
        }
    }

    /// Drain frames until the close marker. False on timeout.
    pub async fn observed_close(&mut self) -> bool {
        loop {
            match self.next_item().await {
                Some(Outbound::Close) => return true,
                Some(Outbound::Frame(_)) => continue,
                None => return false,
            }
        }
    }
}

fn settings(handshake_timeout: Duration) -> HubSettings {
    HubSettings {
        node: "001".to_string(),
        handshake_timeout,
        outbound_queue: 32,
    }
}

/// Hub with the given hooks and test settings.
pub fn hub_with(hooks: Arc<dyn SessionHooks>) -> Arc<Hub> {
    Arc::new(Hub::new(settings(PEER_WAIT), hooks))
}

/// Hooks that accept everyone and record what they see.
#[derive(Default)]
pub struct RecordingHooks {
    forbidden: Option<&'static str>,
    events: Mutex<Vec<String>>,
    lost: Mutex<Vec<SessionId>>,
}

impl RecordingHooks {
    /// Refuse any name starting with `prefix`.
    pub fn forbidding(prefix: &'static str) -> Self {
        Self {
            forbidden: Some(prefix),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn lost(&self) -> Vec<SessionId> {
        self.lost.lock().clone()
    }
}

#[async_trait]
impl SessionHooks for RecordingHooks {
    async fn accept(&self, _hub: &Arc<Hub>, _session: &Arc<Session>) -> Result<(), HandshakeError> {
        Ok(())
    }

    fn before_dispatch(&self, _session: &Session, name: &str) -> Result<(), DispatchError> {
        match self.forbidden {
            Some(prefix) if name.starts_with(prefix) => Err(DispatchError::Forbidden {
                role: RoleName::User,
                name: name.to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn event(
        &self,
        _hub: &Arc<Hub>,
        _session: &Arc<Session>,
        name: &str,
        _payload: Value,
    ) -> Result<(), HandlerError> {
        self.events.lock().push(name.to_string());
        Ok(())
    }

    async fn rpc(
        &self,
        _hub: &Arc<Hub>,
        _session: &Arc<Session>,
        method: &str,
        _params: Value,
    ) -> Result<Value, HandlerError> {
        Ok(Value::String(method.to_string()))
    }

    async fn session_lost(&self, _hub: &Arc<Hub>, session: &Arc<Session>) {
        self.lost.lock().push(session.id().clone());
    }
}

/// A hub wired to a real broker with hosts `alice`/`s1` and `bob`/`s2`.
pub struct Fixture {
    pub hub: Arc<Hub>,
    pub broker: Arc<Broker>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_timeout(PEER_WAIT)
    }

    pub fn with_timeout(handshake_timeout: Duration) -> Self {
        let secrets = HashMap::from([
            ("alice".to_string(), "s1".to_string()),
            ("bob".to_string(), "s2".to_string()),
        ]);
        let broker = Arc::new(Broker::new(secrets));
        let hooks = Arc::new(BrokerHooks::new(Arc::clone(&broker)));
        let hub = Arc::new(Hub::new(settings(handshake_timeout), hooks));
        Self { hub, broker }
    }

    /// Open a session, send `opening` and run the accept hook.
    pub async fn handshake(&self, opening: Value) -> Result<(Arc<Session>, Peer), HandshakeError> {
        let (session, peer) = Peer::attached(&self.hub);
        peer.send(opening);
        self.hub.accept(&session).await?;
        Ok((session, peer))
    }

    /// A verified user; the echo challenge is already consumed.
    pub async fn user(&self) -> (Arc<Session>, Peer) {
        let (session, mut peer) = Peer::attached(&self.hub);
        peer.send(json!({"role": "user"}));
        let accepting = tokio::spawn({
            let (hub, session) = (Arc::clone(&self.hub), Arc::clone(&session));
            async move { hub.accept(&session).await }
        });
        let (name, challenge) = peer.next_event().await.expect("challenge");
        assert_eq!(name, "rand.check");
        peer.send(json!({"rand.back": challenge.as_i64().expect("integer") + 1}));
        accepting
            .await
            .expect("accept task")
            .expect("user verified");
        (session, peer)
    }

    pub fn ctx<'a>(&'a self, session: &'a Arc<Session>) -> Context<'a> {
        Context {
            hub: &self.hub,
            broker: &self.broker,
            session,
        }
    }
}
