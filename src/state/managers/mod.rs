//! Domain managers for broker state.
//!
//! Each manager owns one registry behind its own lock. No manager calls into
//! another while holding its lock.

pub mod host;
pub mod queue;
pub mod slave;
pub mod user;
