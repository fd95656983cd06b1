//! Error types for frame and handshake decoding.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtoError`].
pub type Result<T, E = ProtoError> = std::result::Result<T, E>;

/// Errors produced while decoding wire data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtoError {
    /// The text was not valid JSON, or did not match the frame shape.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// A handshake message was not a JSON object.
    #[error("handshake message is not an object")]
    NotAnObject,

    /// A required field was absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A field was present but had the wrong JSON type.
    #[error("field `{field}` must be {expected}")]
    InvalidField {
        /// Field name as it appears on the wire.
        field: &'static str,
        /// Human readable description of the expected type.
        expected: &'static str,
    },

    /// The `role` field named something other than user, host or slave.
    #[error("unknown role `{0}`")]
    UnknownRole(String),
}
