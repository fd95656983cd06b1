//! Session identifier generation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a session.
pub type SessionId = String;

/// Generates unique session ids.
///
/// Format: node id (3 chars) + counter (base36, at least 6 chars). The first
/// 36^6 ids are 9 chars total, e.g. "001AAAAAB"; after that the counter part
/// widens instead of wrapping.
///
/// Ids are unique for the process lifetime; they are identifiers, not
/// credentials.
pub struct SessionIdGenerator {
    node: String,
    counter: AtomicU64,
}

impl SessionIdGenerator {
    /// Create a new generator for the given node id.
    pub fn new(node: String) -> Self {
        Self {
            node,
            counter: AtomicU64::new(0),
        }
    }

    /// Generate the next unique id.
    pub fn next(&self) -> SessionId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.node, base36_encode(n))
    }
}

/// Minimum width of the counter part.
const COUNTER_WIDTH: usize = 6;

/// Encode a number in base36, left-padded with 'A' to [`COUNTER_WIDTH`].
fn base36_encode(mut n: u64) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut digits = Vec::with_capacity(COUNTER_WIDTH);

    while n > 0 || digits.len() < COUNTER_WIDTH {
        digits.push(CHARS[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();

    String::from_utf8_lossy(&digits).into_owned()
}
