//! Handshake verification.
//!
//! Runs once per connection before it is usable. The opening message selects
//! the role:
//!
//! - user: echo challenge (`rand.check` n, answer `rand.back` n+1), then join
//!   the all-users room
//! - host: secret check, then single-occupancy registration by name
//! - slave: secret check, namespace check, lookup of a provisioned slave,
//!   supersede of any live session, then an admission pass
//!
//! Any error aborts the handshake; the connection closes the session.

use crate::error::HandshakeError;
use crate::handlers::admission;
use crate::network::{Hub, Session};
use crate::state::managers::slave::in_namespace;
use crate::state::{Broker, Role, SecretCheck};
use futures_util::FutureExt;
use rand::Rng;
use sharecast_proto::names::{event, room};
use sharecast_proto::{Handshake, echo_reply};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Upper bound (exclusive) for the echo challenge.
const CHALLENGE_RANGE: i64 = 86_400;

/// Verify a new session and attach its role.
///
/// A panic inside verification is converted into [`HandshakeError::Internal`].
pub async fn verify(
    hub: &Arc<Hub>,
    broker: &Arc<Broker>,
    session: &Arc<Session>,
) -> Result<(), HandshakeError> {
    match AssertUnwindSafe(run(hub, broker, session)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(panic = %message, "Handshake panicked");
            Err(HandshakeError::Internal(message))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handshake panicked".to_string()
    }
}

async fn run(hub: &Arc<Hub>, broker: &Arc<Broker>, session: &Arc<Session>) -> Result<(), HandshakeError> {
    let opening = session.read().await?;
    match Handshake::parse(&opening)? {
        Handshake::User => verify_user(hub, broker, session).await,
        Handshake::Host {
            host_name,
            host_secret,
        } => verify_host(broker, session, host_name, &host_secret),
        Handshake::Slave {
            host_name,
            host_secret,
            slave_name,
        } => verify_slave(hub, broker, session, &host_name, &host_secret, slave_name),
    }
}

fn check_secret(broker: &Broker, host: &str, secret: &str) -> Result<(), HandshakeError> {
    broker.verify_secret(host, secret).map_err(|check| match check {
        SecretCheck::UnknownHost => HandshakeError::UnknownHost(host.to_string()),
        SecretCheck::Mismatch => HandshakeError::SecretMismatch(host.to_string()),
    })
}

async fn verify_user(
    hub: &Arc<Hub>,
    broker: &Arc<Broker>,
    session: &Arc<Session>,
) -> Result<(), HandshakeError> {
    let challenge = rand::thread_rng().gen_range(0..CHALLENGE_RANGE);
    session.emit(event::RAND_CHECK, challenge);

    let reply = session.read().await?;
    let got = echo_reply(&reply)?;
    let expected = challenge + 1;
    if got != expected {
        return Err(HandshakeError::EchoMismatch { expected, got });
    }

    let user = broker.users.register(session);
    if session.attach(Role::User(Arc::clone(&user))).is_err() {
        broker.users.remove(&user);
        return Err(HandshakeError::AlreadyAttached);
    }
    hub.join(session, room::ALL_USERS);
    debug!("User verified");
    Ok(())
}

fn verify_host(
    broker: &Broker,
    session: &Arc<Session>,
    host_name: String,
    host_secret: &str,
) -> Result<(), HandshakeError> {
    check_secret(broker, &host_name, host_secret)?;

    let mut attached = false;
    let registered = broker.hosts.register(&host_name, session, |host| {
        attached = session.attach(Role::Host(Arc::clone(host))).is_ok();
    });
    match registered {
        Ok(_) if attached => {
            info!(host = %host_name, "Host registered");
            Ok(())
        }
        Ok(_) => {
            broker.hosts.remove(&host_name, session.id());
            Err(HandshakeError::AlreadyAttached)
        }
        Err(holder) => {
            session.emit(event::ERROR_REGISTER_ALREADY, holder.clone());
            Err(HandshakeError::AlreadyRegistered {
                name: host_name,
                holder,
            })
        }
    }
}

fn verify_slave(
    hub: &Arc<Hub>,
    broker: &Arc<Broker>,
    session: &Arc<Session>,
    host_name: &str,
    host_secret: &str,
    slave_name: String,
) -> Result<(), HandshakeError> {
    check_secret(broker, host_name, host_secret)?;
    if !in_namespace(host_name, &slave_name) {
        return Err(HandshakeError::Namespace {
            host: host_name.to_string(),
            slave: slave_name,
        });
    }
    let slave = broker
        .slaves
        .get(&slave_name)
        .ok_or_else(|| HandshakeError::UnknownSlave(slave_name.clone()))?;
    if slave.host() != host_name {
        return Err(HandshakeError::Namespace {
            host: host_name.to_string(),
            slave: slave_name,
        });
    }

    session
        .attach(Role::Slave(Arc::clone(&slave)))
        .map_err(|_| HandshakeError::AlreadyAttached)?;
    slave.attach_session(Arc::clone(session), |old| {
        info!(slave = %slave_name, superseded = %old.id(), "Slave reconnect supersedes live session");
        if !hub.remove_session(old.id()) {
            old.close();
        }
    });
    info!(slave = %slave_name, host = %host_name, "Slave attached");

    admission::run(broker);
    Ok(())
}
