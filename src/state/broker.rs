//! The Broker - central shared state.
//!
//! The Broker holds the host secrets and every registry, and is shared by all
//! connection tasks. No task owns it; every mutation goes through the lock of
//! the registry it touches.

use crate::network::Session;
use crate::state::{
    Admission, AdmissionQueue, HostManager, QueueCounters, Slave, SlaveManager, User, UserManager,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::debug;

/// Why a host secret was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretCheck {
    UnknownHost,
    Mismatch,
}

/// Central shared state container.
pub struct Broker {
    /// Host name to secret. Read-only after construction.
    host_secrets: HashMap<String, String>,
    pub hosts: HostManager,
    pub slaves: SlaveManager,
    pub users: UserManager,
    pub queue: AdmissionQueue,
    started_at: DateTime<Utc>,
}

/// Counts reported by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BrokerStats {
    pub sessions: usize,
    pub hosts: usize,
    pub slaves: usize,
    pub slaves_online: usize,
    pub slaves_serving: usize,
    pub users: usize,
    pub users_peak: usize,
    #[serde(flatten)]
    pub queue: QueueCounters,
    /// RFC 3339 start time.
    pub started_at: String,
}

impl Broker {
    pub fn new(host_secrets: HashMap<String, String>) -> Self {
        Self {
            host_secrets,
            hosts: HostManager::new(),
            slaves: SlaveManager::new(),
            users: UserManager::new(),
            queue: AdmissionQueue::new(),
            started_at: Utc::now(),
        }
    }

    /// Check `secret` against the configured secret for `host`.
    ///
    /// Runs one constant-time comparison whether or not the host is known.
    pub fn verify_secret(&self, host: &str, secret: &str) -> Result<(), SecretCheck> {
        match self.host_secrets.get(host) {
            Some(expected) => {
                if bool::from(secret.as_bytes().ct_eq(expected.as_bytes())) {
                    Ok(())
                } else {
                    Err(SecretCheck::Mismatch)
                }
            }
            None => {
                let _ = secret.as_bytes().ct_eq(secret.as_bytes());
                Err(SecretCheck::UnknownHost)
            }
        }
    }

    /// Pair idle slaves with waiters until either runs out.
    ///
    /// Slaves are visited in name order from a snapshot; each is locked on
    /// its own while it admits.
    pub fn admit_waiting(&self) -> Vec<Admission> {
        let mut admitted = Vec::new();
        if self.queue.is_empty() {
            return admitted;
        }
        for slave in self.slaves.snapshot() {
            if self.queue.is_empty() {
                break;
            }
            if let Some(admission) = slave.admit_from(&self.queue, &self.users) {
                debug!(slave = %admission.slave, viewer = %admission.viewer.id(), order = admission.order, "Admitted viewer");
                admitted.push(admission);
            }
        }
        admitted
    }

    /// Break the pairing between `user` and its slave, if any.
    ///
    /// Returns the slave and, if the slave still had this user as its viewer,
    /// the slave's session to notify.
    pub fn unpair_user(&self, user: &User) -> Option<(Arc<Slave>, Option<Arc<Session>>)> {
        let slave = user.take_slave()?;
        let notify = slave.release_viewer_if(user.session_id()).flatten();
        Some((slave, notify))
    }

    pub fn stats(&self, sessions: usize) -> BrokerStats {
        let slaves = self.slaves.snapshot();
        BrokerStats {
            sessions,
            hosts: self.hosts.len(),
            slaves: slaves.len(),
            slaves_online: slaves.iter().filter(|s| s.is_online()).count(),
            slaves_serving: slaves.iter().filter(|s| s.is_serving()).count(),
            users: self.users.len(),
            users_peak: self.users.peak(),
            queue: self.queue.counters(),
            started_at: self.started_at.to_rfc3339(),
        }
    }
}
