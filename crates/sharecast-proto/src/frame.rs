//! Post-handshake frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// A JSON text frame exchanged after the handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Frame {
    /// Fire-and-forget event.
    Event {
        /// Namespaced event name.
        event: String,
        /// Arbitrary payload.
        #[serde(default)]
        payload: Value,
    },
    /// Call expecting a [`Frame::Reply`] with the same id.
    Rpc {
        /// Caller-chosen correlation id.
        id: u64,
        /// Namespaced method name.
        method: String,
        /// Arbitrary parameters.
        #[serde(default)]
        params: Value,
    },
    /// Answer to an RPC. Exactly one of `result` / `error` is set.
    Reply {
        /// Id of the call being answered.
        id: u64,
        /// Successful result.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Error code on failure.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl Frame {
    /// Build an event frame.
    pub fn event(event: impl Into<String>, payload: impl Into<Value>) -> Self {
        Frame::Event {
            event: event.into(),
            payload: payload.into(),
        }
    }

    /// Build a successful reply.
    pub fn ok(id: u64, result: Value) -> Self {
        Frame::Reply {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build a failed reply.
    pub fn err(id: u64, error: impl Into<String>) -> Self {
        Frame::Reply {
            id,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Event or method name, if this frame carries one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Frame::Event { event, .. } => Some(event),
            Frame::Rpc { method, .. } => Some(method),
            Frame::Reply { .. } => None,
        }
    }

    /// Decode a frame from JSON text.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Decode a frame from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Encode as JSON text.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
