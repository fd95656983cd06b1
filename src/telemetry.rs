//! Telemetry utilities: subscriber setup, dispatch timing and spans.

use std::time::Instant;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log format (`json` or anything else for text).
pub const LOG_FORMAT_ENV: &str = "SHARECASTD_LOG_FORMAT";

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Guard for timing event and RPC dispatch.
///
/// Logs the elapsed time when dropped.
pub struct DispatchTimer {
    name: String,
    start: Instant,
}

impl DispatchTimer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Instant::now(),
        }
    }
}

impl Drop for DispatchTimer {
    fn drop(&mut self) {
        let micros = self.start.elapsed().as_micros() as u64;
        debug!(name = %self.name, micros, "Dispatched");
    }
}

/// Standardized span constructors.
pub mod spans {
    use std::net::SocketAddr;
    use tracing::{Span, debug_span, info_span};

    /// Span covering one connection's whole life.
    pub fn session(id: &str, remote: SocketAddr) -> Span {
        info_span!("session", id = %id, remote = %remote)
    }

    /// Span for a single event or RPC dispatch.
    pub fn dispatch(name: &str, session: &str) -> Span {
        debug_span!("dispatch", name = %name, session = %session)
    }
}
