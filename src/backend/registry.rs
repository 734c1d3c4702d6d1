//! Backend endpoint registry.
//!
//! Holds the ordered, startup-fixed set of backend endpoints together with
//! an advisory last-seen liveness flag per endpoint. Liveness is re-probed
//! before every selection; the flag only exists so up/down transitions can
//! be observed and logged.

use crate::config::BackendEndpointConfig;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// A single backend endpoint. Immutable identity, built once from config.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BackendEndpoint {
    pub host: String,
    pub port: u16,
}

impl BackendEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl From<&BackendEndpointConfig> for BackendEndpoint {
    fn from(cfg: &BackendEndpointConfig) -> Self {
        Self::new(cfg.host.clone(), cfg.port)
    }
}

impl fmt::Display for BackendEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Ordered registry of backend endpoints.
///
/// The order is fixed at startup and drives round-robin determinism.
/// Validation guarantees the registry is non-empty.
pub struct BackendRegistry {
    endpoints: Vec<BackendEndpoint>,
    // Last probe outcome per endpoint. Advisory only, never consulted
    // when selecting; a recovered backend is eligible on the very next
    // selection regardless of this flag.
    last_seen_alive: Vec<AtomicBool>,
}

impl BackendRegistry {
    /// Create a registry from the configured endpoint list.
    ///
    /// Endpoints start out assumed alive until a probe says otherwise.
    pub fn new(endpoints: Vec<BackendEndpoint>) -> Self {
        let last_seen_alive = endpoints.iter().map(|_| AtomicBool::new(true)).collect();
        Self {
            endpoints,
            last_seen_alive,
        }
    }

    /// Build a registry from configuration entries.
    pub fn from_config(backends: &[BackendEndpointConfig]) -> Self {
        Self::new(backends.iter().map(BackendEndpoint::from).collect())
    }

    /// Number of registered endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Endpoint at the given index.
    pub fn get(&self, index: usize) -> &BackendEndpoint {
        &self.endpoints[index]
    }

    /// All endpoints, in registration order.
    pub fn endpoints(&self) -> &[BackendEndpoint] {
        &self.endpoints
    }

    /// Record the outcome of a probe and return the previous flag,
    /// so callers can log up/down transitions.
    pub fn record_probe(&self, index: usize, alive: bool) -> bool {
        self.last_seen_alive[index].swap(alive, Ordering::Relaxed)
    }

    /// Last recorded probe outcome for the endpoint at `index`.
    pub fn last_seen_alive(&self, index: usize) -> bool {
        self.last_seen_alive[index].load(Ordering::Relaxed)
    }
}
