//! # sharecast-proto
//!
//! Wire vocabulary shared by the sharecast broker and its clients.
//!
//! The broker speaks JSON over WebSocket text frames. A connection starts with
//! a handshake made of plain JSON objects (see [`handshake`]) and then switches
//! to typed [`Frame`]s carrying events and RPC calls. Every event and RPC name
//! lives in the namespace of exactly one [`RoleName`]: `user.*`, `host.*` or
//! `slave.*`.
//!
//! ```rust
//! use sharecast_proto::{Frame, RoleName};
//!
//! let frame = Frame::decode(r#"{"type":"event","event":"user.queue.leave"}"#).unwrap();
//! assert_eq!(frame.name(), Some("user.queue.leave"));
//! assert!(RoleName::User.owns("user.queue.leave"));
//! assert!(!RoleName::Host.owns("user.queue.leave"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod frame;
pub mod handshake;
pub mod names;
pub mod role;

pub use error::{ProtoError, Result};
pub use frame::Frame;
pub use handshake::{Handshake, echo_reply};
pub use role::{NAMESPACE_SEPARATOR, RoleName};
