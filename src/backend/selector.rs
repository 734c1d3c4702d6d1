//! Bounded-retry backend selection.

use crate::backend::registry::{BackendEndpoint, BackendRegistry};
use crate::backend::strategy::Strategy;
use crate::health::Probe;
use std::sync::Arc;
use tracing::{info, warn};

/// Selects a live backend for each incoming connection.
///
/// Each selection draws candidate indices from the strategy and probes them,
/// attempting at most `registry.len()` candidates so an all-dead registry
/// can never livelock a connection.
pub struct Selector<P> {
    registry: Arc<BackendRegistry>,
    strategy: Box<dyn Strategy>,
    prober: P,
}

impl<P: Probe> Selector<P> {
    pub fn new(registry: Arc<BackendRegistry>, strategy: Box<dyn Strategy>, prober: P) -> Self {
        Self {
            registry,
            strategy,
            prober,
        }
    }

    /// Pick the next live backend, or `None` if every attempt within the
    /// bound failed its probe.
    pub async fn select(&self) -> Option<BackendEndpoint> {
        let len = self.registry.len();

        for attempt in 1..=len {
            let index = self.strategy.next_index(len);
            let endpoint = self.registry.get(index);

            if self.prober.probe(endpoint).await {
                let was_alive = self.registry.record_probe(index, true);
                if !was_alive {
                    info!(backend = %endpoint, "backend recovered");
                }
                info!(backend = %endpoint, attempt, "selected backend");
                return Some(endpoint.clone());
            }

            self.registry.record_probe(index, false);
            warn!(backend = %endpoint, attempt, attempts_max = len, "probe failed, skipping backend");
        }

        warn!(attempts = len, "no backend available");
        None
    }

    /// The registry this selector draws from.
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }
}
