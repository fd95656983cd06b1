//! Connection - drives one upgraded WebSocket.
//!
//! Each connection runs in its own Tokio task:
//!
//! ```text
//! Phase 1: Handshake (hub.accept, sequential reads with timeout)
//!    ↓
//! Phase 2: Dispatch loop (one frame at a time, in arrival order)
//!    ↓
//! Phase 3: Teardown (hub.teardown -> session_lost hook)
//! ```
//!
//! Socket I/O lives in two helper tasks: a reader that decodes text frames
//! into the session's inbound queue, and a writer that drains the outbound
//! queue and finishes with a close frame.

use crate::network::Hub;
use crate::network::session::{Inbound, Outbound, Session};
use crate::telemetry::spans;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use sharecast_proto::Frame;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

/// Serve one connection until it closes.
pub async fn serve(hub: Arc<Hub>, socket: WebSocket, remote: SocketAddr) {
    let io = hub.open_session();
    let session = io.session;
    let span = spans::session(session.id(), remote);

    async move {
        info!("Connection opened");
        let (sink, stream) = socket.split();
        let writer = tokio::spawn(write_loop(sink, io.outbound, session.close_token()));
        let reader = tokio::spawn(read_loop(stream, io.inbound, Arc::clone(&session)));

        match hub.accept(&session).await {
            Ok(()) => {
                let role = session.role().map(|r| r.role_name().as_str()).unwrap_or("none");
                info!(role, "Session accepted");
                dispatch_loop(&hub, &session).await;
            }
            Err(e) => {
                warn!(code = e.error_code(), kind = ?e.kind(), error = %e, "Handshake rejected");
            }
        }

        hub.teardown(&session).await;
        reader.abort();
        if let Err(e) = writer.await {
            debug!(error = %e, "Writer task ended abnormally");
        }
        info!("Connection closed");
    }
    .instrument(span)
    .await
}

async fn dispatch_loop(hub: &Arc<Hub>, session: &Arc<Session>) {
    while let Some(inbound) = session.next_message().await {
        let value = match inbound {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Ignoring malformed message");
                continue;
            }
        };
        match Frame::from_value(value) {
            Ok(frame) => hub.dispatch(session, frame).await,
            Err(e) => debug!(error = %e, "Ignoring undecodable frame"),
        }
    }
}

async fn read_loop(
    mut stream: SplitStream<WebSocket>,
    inbound: mpsc::Sender<Inbound>,
    session: Arc<Session>,
) {
    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    debug!("Dropping non-UTF-8 binary message");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "WebSocket read error");
                break;
            }
        };
        if inbound.send(serde_json::from_str(&text)).await.is_err() {
            break;
        }
    }
    session.close();
}

async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
    closed: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            item = outbound.recv() => match item {
                Some(Outbound::Frame(frame)) => {
                    let text = match frame.encode() {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, "Failed to encode frame");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text)).await.is_err() {
                        return;
                    }
                }
                Some(Outbound::Close) | None => break,
            },
            _ = closed.cancelled() => break,
        }
    }
    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;
}
