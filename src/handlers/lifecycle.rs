//! Session-lost handling.
//!
//! Runs once per connection after the hub has closed and removed it. A
//! session that never finished its handshake has no role and needs nothing.
//!
//! Hosts and users announce their departure before leaving the registries;
//! slaves check that the lost session is still the attached one before
//! clearing anything, since a reconnect may already have replaced it.

use crate::handlers::admission;
use crate::network::{Hub, Session};
use crate::state::{Broker, Host, Role, Slave, User};
use chrono::Utc;
use sharecast_proto::names::{event, room};
use std::sync::Arc;
use tracing::{debug, info};

pub fn session_lost(hub: &Hub, broker: &Broker, session: &Arc<Session>) {
    match session.role() {
        None => debug!("Session lost before handshake completed"),
        Some(Role::User(user)) => user_left(hub, broker, session, user),
        Some(Role::Host(host)) => host_left(hub, broker, host),
        Some(Role::Slave(slave)) => slave_left(broker, session, slave),
    }
}

fn host_left(hub: &Hub, broker: &Broker, host: &Host) {
    hub.broadcast(room::ALL_USERS, event::SYSTEM_HOST_LEAVE, host.name());
    if broker.hosts.remove(host.name(), host.session_id()) {
        let online_secs = (Utc::now() - host.registered_at()).num_seconds();
        info!(host = %host.name(), online_secs, "Host left");
    }
}

fn user_left(hub: &Hub, broker: &Broker, session: &Session, user: &Arc<User>) {
    for room in session.rooms() {
        hub.broadcast(&room, event::USER_LEAVE, session.id().as_str());
    }
    if let Some(wait) = user.dequeue(&broker.queue) {
        debug!(order = wait.order, "Left admission queue");
    }
    broker.users.remove(user);

    if let Some((slave, notify)) = broker.unpair_user(user) {
        if let Some(slave_session) = notify {
            slave_session.emit(event::SLAVE_VIEWER_LEAVE, session.id().as_str());
        }
        debug!(slave = %slave.name(), "Viewer released slave");
        admission::run(broker);
    }
}

fn slave_left(broker: &Broker, session: &Session, slave: &Slave) {
    let Some(release) = slave.release_if_current(session.id()) else {
        return;
    };
    info!(slave = %slave.name(), "Slave left");
    if let Some(viewer) = release.viewer {
        if let Some(user) = broker.users.get(viewer.id()) {
            user.clear_slave_if(slave);
        }
        viewer.emit(event::SYSTEM_SLAVE_LEAVE, slave.name());
    }
    admission::run(broker);
}
