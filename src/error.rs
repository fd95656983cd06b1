//! Unified error handling for sharecastd.
//!
//! This module provides the error hierarchy for the broker, with automatic
//! conversions and static labels for logs and wire replies.

use crate::network::ReadError;
use crate::state::ProvisionError;
use sharecast_proto::{ProtoError, RoleName};
use thiserror::Error;

/// Broad class of a handshake failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing fields, failed echo check.
    Protocol,
    /// Unknown host, wrong secret, name outside the host's namespace.
    Authentication,
    /// Name already held, unknown slave.
    Conflict,
    /// Unexpected failure inside the broker.
    Internal,
}

// ============================================================================
// Handshake Errors (connection admission)
// ============================================================================

/// Errors that abort a handshake. The session is closed on any of them.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("read failed: {0}")]
    Read(#[from] ReadError),

    #[error("malformed handshake: {0}")]
    Malformed(#[from] ProtoError),

    #[error("echo check failed: expected {expected}, got {got}")]
    EchoMismatch { expected: i64, got: i64 },

    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error("secret mismatch for host {0}")]
    SecretMismatch(String),

    #[error("slave {slave} is outside host {host}'s namespace")]
    Namespace { host: String, slave: String },

    #[error("host {name} already registered by session {holder}")]
    AlreadyRegistered { name: String, holder: String },

    #[error("unknown slave: {0}")]
    UnknownSlave(String),

    #[error("session already carries a role")]
    AlreadyAttached,

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandshakeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read(_) | Self::Malformed(_) | Self::EchoMismatch { .. } => ErrorKind::Protocol,
            Self::UnknownHost(_) | Self::SecretMismatch(_) | Self::Namespace { .. } => {
                ErrorKind::Authentication
            }
            Self::AlreadyRegistered { .. } | Self::UnknownSlave(_) => ErrorKind::Conflict,
            Self::AlreadyAttached | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Get a static error code string for log labeling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Read(ReadError::Timeout(_)) => "read_timeout",
            Self::Read(ReadError::Closed) => "read_closed",
            Self::Read(ReadError::Malformed(_)) => "read_malformed",
            Self::Malformed(_) => "malformed",
            Self::EchoMismatch { .. } => "echo_mismatch",
            Self::UnknownHost(_) => "unknown_host",
            Self::SecretMismatch(_) => "secret_mismatch",
            Self::Namespace { .. } => "namespace",
            Self::AlreadyRegistered { .. } => "already_registered",
            Self::UnknownSlave(_) => "unknown_slave",
            Self::AlreadyAttached => "already_attached",
            Self::Internal(_) => "internal_error",
        }
    }
}

// ============================================================================
// Dispatch Errors (authorization filter)
// ============================================================================

/// A post-handshake message that may not be dispatched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("{role} may not send {name}")]
    Forbidden { role: RoleName, name: String },

    #[error("session has no role")]
    Unauthenticated,

    #[error("no handler for {0}")]
    UnknownHandler(String),
}

impl DispatchError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Forbidden { .. } => "forbidden",
            Self::Unauthenticated => "unauthenticated",
            Self::UnknownHandler(_) => "unknown_method",
        }
    }
}

// ============================================================================
// Handler Errors (event and RPC processing)
// ============================================================================

/// Errors returned by event and RPC handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("not queued")]
    NotQueued,

    #[error("already being served")]
    AlreadyServing,

    #[error("ticket does not match")]
    TicketMismatch,

    #[error("role mismatch")]
    WrongRole,

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl HandlerError {
    /// Get a static error code string, sent as the RPC reply error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidParams(_) => "invalid_params",
            Self::NotQueued => "not_queued",
            Self::AlreadyServing => "already_serving",
            Self::TicketMismatch => "ticket_mismatch",
            Self::WrongRole => "wrong_role",
            Self::Provision(ProvisionError::EmptyName) => "invalid_params",
            Self::Provision(ProvisionError::Namespace { .. }) => "namespace",
            Self::Provision(ProvisionError::Owned { .. }) => "already_owned",
            Self::Dispatch(e) => e.error_code(),
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidParams(err.to_string())
    }
}
