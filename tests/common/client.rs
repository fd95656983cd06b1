//! Test WebSocket client.
//!
//! Speaks the broker's JSON protocol: handshake objects first, then event and
//! RPC frames. Events that arrive while waiting for something else are kept
//! and served to later `expect_event` calls.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A test client.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pending: VecDeque<Value>,
    next_id: u64,
}

impl TestClient {
    /// Connect to a broker WebSocket endpoint.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (ws, _response) = connect_async(url).await?;
        Ok(Self {
            ws,
            pending: VecDeque::new(),
            next_id: 1,
        })
    }

    /// Send a JSON value as a text frame.
    pub async fn send_json(&mut self, value: Value) -> anyhow::Result<()> {
        self.ws.send(Message::Text(value.to_string())).await?;
        Ok(())
    }

    /// Receive the next JSON message. Fails on close or timeout.
    pub async fn recv(&mut self) -> anyhow::Result<Value> {
        loop {
            let message = timeout(RECV_TIMEOUT, self.ws.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection ended"))??;
            match message {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(_) => anyhow::bail!("connection closed"),
                _ => continue,
            }
        }
    }

    /// Wait for event `name`, returning its payload. Other events are kept.
    pub async fn expect_event(&mut self, name: &str) -> anyhow::Result<Value> {
        if let Some(pos) = self.pending.iter().position(|f| f["event"] == name) {
            if let Some(frame) = self.pending.remove(pos) {
                return Ok(frame["payload"].clone());
            }
        }
        loop {
            let frame = self.recv().await?;
            if frame["type"] == "event" && frame["event"] == name {
                return Ok(frame["payload"].clone());
            }
            if frame["type"] == "event" {
                self.pending.push_back(frame);
            }
        }
    }

    /// Send an event frame.
    pub async fn emit(&mut self, event: &str, payload: Value) -> anyhow::Result<()> {
        self.send_json(json!({"type": "event", "event": event, "payload": payload}))
            .await
    }

    /// Call an RPC and return the reply frame.
    pub async fn call(&mut self, method: &str, params: Value) -> anyhow::Result<Value> {
        let id = self.next_id;
        self.next_id += 1;
        self.send_json(json!({"type": "rpc", "id": id, "method": method, "params": params}))
            .await?;
        loop {
            let frame = self.recv().await?;
            if frame["type"] == "reply" && frame["id"] == id {
                return Ok(frame);
            }
            if frame["type"] == "event" {
                self.pending.push_back(frame);
            }
        }
    }

    /// True if the broker closes the connection (close frame or EOF) in time.
    pub async fn expect_closed(&mut self) -> bool {
        loop {
            match timeout(RECV_TIMEOUT, self.ws.next()).await {
                Err(_) => return false,
                Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }

    /// Complete the user handshake, answering the echo challenge with `n + offset`.
    pub async fn user_handshake(&mut self, offset: i64) -> anyhow::Result<()> {
        self.send_json(json!({"role": "user"})).await?;
        let challenge = self.expect_event("rand.check").await?;
        let n = challenge
            .as_i64()
            .ok_or_else(|| anyhow::anyhow!("non-integer challenge: {challenge}"))?;
        self.send_json(json!({"rand.back": n + offset})).await
    }

    /// Send the host handshake.
    pub async fn host_handshake(&mut self, name: &str, secret: &str) -> anyhow::Result<()> {
        self.send_json(json!({"role": "host", "host_name": name, "host_secret": secret}))
            .await
    }

    /// Send the slave handshake.
    pub async fn slave_handshake(&mut self, host: &str, secret: &str, slave: &str) -> anyhow::Result<()> {
        self.send_json(json!({
            "role": "slave",
            "host_name": host,
            "host_secret": secret,
            "salve_name": slave,
        }))
        .await
    }
}
