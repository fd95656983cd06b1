//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::collections::HashSet;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server.node must be exactly 3 ASCII alphanumeric characters, got '{0}'")]
    InvalidNode(String),
    #[error("server.ws_path must start with '/', got '{0}'")]
    InvalidWsPath(String),
    #[error("hosts entry has an empty name")]
    EmptyHostName,
    #[error("host '{0}' has an empty secret")]
    EmptySecret(String),
    #[error("host '{0}' is declared more than once")]
    DuplicateHost(String),
    #[error("slave '{slave}' is outside the namespace of host '{host}'")]
    SlaveOutsideNamespace { host: String, slave: String },
    #[error("slave '{0}' is declared more than once")]
    DuplicateSlave(String),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let node = &config.server.node;
    if node.len() != 3 || !node.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.push(ValidationError::InvalidNode(node.clone()));
    }

    if !config.server.ws_path.starts_with('/') {
        errors.push(ValidationError::InvalidWsPath(config.server.ws_path.clone()));
    }

    let mut hosts = HashSet::new();
    let mut slaves = HashSet::new();
    for host in &config.hosts {
        if host.name.is_empty() {
            errors.push(ValidationError::EmptyHostName);
        }
        if host.secret.is_empty() {
            errors.push(ValidationError::EmptySecret(host.name.clone()));
        }
        if !hosts.insert(host.name.as_str()) {
            errors.push(ValidationError::DuplicateHost(host.name.clone()));
        }
        for slave in &host.slaves {
            if !slave.starts_with(&host.name) {
                errors.push(ValidationError::SlaveOutsideNamespace {
                    host: host.name.clone(),
                    slave: slave.clone(),
                });
            }
            if !slaves.insert(slave.as_str()) {
                errors.push(ValidationError::DuplicateSlave(slave.clone()));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
