//! Slave registry.
//!
//! Slaves are provisioned ahead of time (from configuration or by their host)
//! and never created by a handshake. Each name lives in its host's namespace:
//! it must start with the host name.

use crate::state::Slave;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("slave name must not be empty")]
    EmptyName,
    #[error("slave {slave} is outside host {host}'s namespace")]
    Namespace { host: String, slave: String },
    #[error("slave {slave} already belongs to host {owner}")]
    Owned { slave: String, owner: String },
}

/// Tracks provisioned slaves by name.
#[derive(Debug, Default)]
pub struct SlaveManager {
    slaves: RwLock<HashMap<String, Arc<Slave>>>,
}

/// True if `slave` sits in `host`'s namespace (literal prefix).
pub fn in_namespace(host: &str, slave: &str) -> bool {
    slave.starts_with(host)
}

impl SlaveManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision `name` under `host`. Provisioning an existing slave for the
    /// same host returns it unchanged.
    pub fn provision(&self, host: &str, name: &str) -> Result<Arc<Slave>, ProvisionError> {
        if name.is_empty() {
            return Err(ProvisionError::EmptyName);
        }
        if !in_namespace(host, name) {
            return Err(ProvisionError::Namespace {
                host: host.to_string(),
                slave: name.to_string(),
            });
        }
        let mut slaves = self.slaves.write();
        if let Some(existing) = slaves.get(name) {
            if existing.host() != host {
                return Err(ProvisionError::Owned {
                    slave: name.to_string(),
                    owner: existing.host().to_string(),
                });
            }
            return Ok(Arc::clone(existing));
        }
        let slave = Arc::new(Slave::new(name.to_string(), host.to_string()));
        slaves.insert(name.to_string(), Arc::clone(&slave));
        Ok(slave)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Slave>> {
        self.slaves.read().get(name).cloned()
    }

    /// All slaves, in name order. The map lock is released on return.
    pub fn snapshot(&self) -> Vec<Arc<Slave>> {
        let mut all: Vec<_> = self.slaves.read().values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    /// Slaves owned by `host`, in name order.
    pub fn for_host(&self, host: &str) -> Vec<Arc<Slave>> {
        let mut owned: Vec<_> = self
            .slaves
            .read()
            .values()
            .filter(|s| s.host() == host)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.name().cmp(b.name()));
        owned
    }

    pub fn len(&self) -> usize {
        self.slaves.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slaves.read().is_empty()
    }
}
