//! Integration test common infrastructure.
//!
//! Provides utilities for spawning test brokers and driving them with
//! WebSocket clients.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::{HostSpec, TestServer};
