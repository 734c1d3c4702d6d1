//! Per-connection session identifiers for log correlation.

use std::sync::atomic::{AtomicU64, Ordering};

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Process-unique session identifier.
///
/// Format: `conn-{counter}` with the counter zero-padded to 8 hex digits.
#[derive(Clone, Debug)]
pub struct SessionId(String);

impl SessionId {
    /// Allocate the next session id.
    pub fn next() -> Self {
        let count = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("conn-{count:08x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
