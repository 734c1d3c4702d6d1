//! Liveness probing.
//!
//! A probe is a per-selection judgment, not a cached health status: the
//! selector probes a candidate immediately before using it, so a backend
//! that recovers becomes eligible on the very next selection.

use crate::backend::BackendEndpoint;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// A liveness check against one backend endpoint.
pub trait Probe: Send + Sync {
    /// Returns `true` iff the endpoint accepted a connection in time.
    fn probe(&self, endpoint: &BackendEndpoint) -> impl Future<Output = bool> + Send;
}

/// Probes by attempting a TCP connect with a bounded timeout.
///
/// The probe connection is dropped immediately; forwarding always opens a
/// fresh connection of its own.
#[derive(Debug, Clone)]
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Probe for TcpProber {
    async fn probe(&self, endpoint: &BackendEndpoint) -> bool {
        match timeout(
            self.timeout,
            TcpStream::connect((endpoint.host.as_str(), endpoint.port)),
        )
        .await
        {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!(backend = %endpoint, error = %e, "probe connect failed");
                false
            }
            Err(_) => {
                debug!(backend = %endpoint, timeout = ?self.timeout, "probe timed out");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_alive_backend() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept in background
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let prober = TcpProber::new(Duration::from_secs(5));
        let endpoint = BackendEndpoint::new("127.0.0.1", addr.port());
        assert!(prober.probe(&endpoint).await);
    }

    #[tokio::test]
    async fn test_probe_refused() {
        // Port 1 is (very likely) not listening
        let prober = TcpProber::new(Duration::from_secs(5));
        let endpoint = BackendEndpoint::new("127.0.0.1", 1);
        assert!(!prober.probe(&endpoint).await);
    }

    #[tokio::test]
    async fn test_probe_timeout() {
        // Non-routable address to trigger a timeout
        let prober = TcpProber::new(Duration::from_millis(100));
        let endpoint = BackendEndpoint::new("10.255.255.1", 12345);
        assert!(!prober.probe(&endpoint).await);
    }

    #[tokio::test]
    async fn test_probe_recovery() {
        let prober = TcpProber::new(Duration::from_millis(500));

        // Reserve a port, then release it so the first probe fails
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = BackendEndpoint::new("127.0.0.1", addr.port());
        assert!(!prober.probe(&endpoint).await);

        // Backend comes back on the same port; the next probe sees it
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        assert!(prober.probe(&endpoint).await);
    }
}
