//! Admission queue integration tests.
//!
//! Users queue for slaves; slaves coming online or finishing a session admit
//! the earliest waiter.

mod common;

use common::{TestClient, TestServer};
use serde_json::{Value, json};

async fn queued_user(server: &TestServer) -> anyhow::Result<(TestClient, Value)> {
    let mut user = server.connect().await?;
    user.user_handshake(1).await?;
    let reply = user.call("user.queue.join", json!(null)).await?;
    anyhow::ensure!(reply["result"].is_object(), "join failed: {reply}");
    Ok((user, reply["result"].clone()))
}

async fn online_slave(server: &TestServer, name: &str) -> anyhow::Result<TestClient> {
    let mut slave = server.connect().await?;
    slave.slave_handshake("alice", "s1", name).await?;
    let reply = slave.call("slave.status", json!(null)).await?;
    anyhow::ensure!(reply["result"]["slave_name"] == name, "slave not ready: {reply}");
    Ok(slave)
}

#[tokio::test]
async fn join_assigns_increasing_orders() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let (_a, first) = queued_user(&server).await?;
    let (_b, second) = queued_user(&server).await?;

    assert_eq!(first["order"], 1);
    assert_eq!(second["order"], 2);
    assert_ne!(first["ticket"], second["ticket"]);
    Ok(())
}

#[tokio::test]
async fn join_twice_returns_same_ticket() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let (mut user, first) = queued_user(&server).await?;
    let again = user.call("user.queue.join", json!(null)).await?;

    assert_eq!(again["result"], first);
    Ok(())
}

#[tokio::test]
async fn state_reports_position() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let (_a, _) = queued_user(&server).await?;
    let (mut b, ticket) = queued_user(&server).await?;

    let reply = b
        .call("user.queue.state", json!({"ticket": ticket["ticket"]}))
        .await?;
    assert_eq!(reply["result"], json!({"order": 2, "ahead": 1, "in_service": 0}));

    let reply = b.call("user.queue.state", json!({"ticket": "nope"})).await?;
    assert_eq!(reply["error"], "ticket_mismatch");
    Ok(())
}

#[tokio::test]
async fn leaving_removes_from_queue() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let (mut user, ticket) = queued_user(&server).await?;
    user.emit("user.queue.leave", json!(null)).await?;

    let reply = user
        .call("user.queue.state", json!({"ticket": ticket["ticket"]}))
        .await?;
    assert_eq!(reply["error"], "not_queued");
    Ok(())
}

#[tokio::test]
async fn slave_coming_online_admits_earliest_waiter() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let (mut first, _) = queued_user(&server).await?;
    let (mut second, second_ticket) = queued_user(&server).await?;

    let mut slave = online_slave(&server, "alice-cam1").await?;

    let admitted = first.expect_event("queue.admitted").await?;
    assert_eq!(admitted, json!({"slave_name": "alice-cam1", "order": 1}));
    let assigned = slave.expect_event("slave.viewer.assigned").await?;
    assert!(assigned["session_id"].is_string());

    let reply = second
        .call("user.queue.state", json!({"ticket": second_ticket["ticket"]}))
        .await?;
    assert_eq!(reply["result"], json!({"order": 2, "ahead": 0, "in_service": 1}));
    Ok(())
}

#[tokio::test]
async fn waiter_is_admitted_immediately_when_slave_is_idle() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut slave = online_slave(&server, "alice-cam2").await?;
    let (mut user, _) = queued_user(&server).await?;

    let admitted = user.expect_event("queue.admitted").await?;
    assert_eq!(admitted["slave_name"], "alice-cam2");
    slave.expect_event("slave.viewer.assigned").await?;

    let again = user.call("user.queue.join", json!(null)).await?;
    assert_eq!(again["error"], "already_serving");
    Ok(())
}

#[tokio::test]
async fn session_end_admits_next_waiter() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let (mut first, _) = queued_user(&server).await?;
    let (mut second, _) = queued_user(&server).await?;
    let mut slave = online_slave(&server, "alice-cam1").await?;
    first.expect_event("queue.admitted").await?;
    slave.expect_event("slave.viewer.assigned").await?;

    slave.emit("slave.session.end", json!(null)).await?;

    assert_eq!(first.expect_event("viewing.end").await?, "alice-cam1");
    let admitted = second.expect_event("queue.admitted").await?;
    assert_eq!(admitted, json!({"slave_name": "alice-cam1", "order": 2}));
    slave.expect_event("slave.viewer.assigned").await?;
    Ok(())
}

#[tokio::test]
async fn viewer_disconnect_frees_slave() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let (first, _) = queued_user(&server).await?;
    let (mut second, _) = queued_user(&server).await?;
    let mut slave = online_slave(&server, "alice-cam1").await?;
    let assigned = slave.expect_event("slave.viewer.assigned").await?;

    drop(first);

    let left = slave.expect_event("slave.viewer.leave").await?;
    assert_eq!(left, assigned["session_id"]);
    second.expect_event("queue.admitted").await?;
    Ok(())
}

#[tokio::test]
async fn slave_disconnect_notifies_viewer() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let (mut viewer, _) = queued_user(&server).await?;
    let slave = online_slave(&server, "alice-cam1").await?;
    viewer.expect_event("queue.admitted").await?;

    drop(slave);

    assert_eq!(viewer.expect_event("system.slave.leave").await?, "alice-cam1");
    Ok(())
}

#[tokio::test]
async fn host_leave_is_broadcast_to_users() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut user = server.connect().await?;
    user.user_handshake(1).await?;
    // Round-trip so the user is registered before the host leaves.
    user.call("user.queue.join", json!(null)).await?;

    let mut host = server.connect().await?;
    host.host_handshake("alice", "s1").await?;
    host.call("host.slave.list", json!(null)).await?;
    drop(host);

    assert_eq!(user.expect_event("system.host.leave").await?, "alice");
    Ok(())
}

#[tokio::test]
async fn host_provisions_and_lists_slaves() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let mut host = server.connect().await?;
    host.host_handshake("alice", "s1").await?;

    let reply = host
        .call("host.slave.provision", json!({"slave_name": "alice-cam3"}))
        .await?;
    assert_eq!(reply["result"], json!({"slave_name": "alice-cam3", "online": false}));

    let reply = host
        .call("host.slave.provision", json!({"slave_name": "bob-cam2"}))
        .await?;
    assert_eq!(reply["error"], "namespace");

    let mut slave = server.connect().await?;
    slave.slave_handshake("alice", "s1", "alice-cam3").await?;
    slave.call("slave.status", json!(null)).await?;

    let reply = host.call("host.slave.list", json!(null)).await?;
    let names: Vec<_> = reply["result"]
        .as_array()
        .map(|a| a.iter().map(|s| s["slave_name"].clone()).collect())
        .unwrap_or_default();
    assert_eq!(names, vec![json!("alice-cam1"), json!("alice-cam2"), json!("alice-cam3")]);
    Ok(())
}
