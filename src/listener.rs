//! Listener and connection dispatch.
//!
//! Accepts inbound connections, asks the selector for a live backend, and
//! hands each accepted connection to its own forwarding task. Clients never
//! see a bare connection reset for "no backend available": exhausted
//! selections get an explicit 503 before the socket closes.

use crate::backend::Selector;
use crate::config::ProxyConfig;
use crate::health::Probe;
use crate::proxy::forward;
use crate::util::SessionId;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Synthesized response for a connection with no live backend.
/// Well-formed so clients get an explicit failure rather than a reset.
const UNAVAILABLE_RESPONSE: &[u8] = b"HTTP/1.1 503 Service Unavailable\r\n\
Content-Type: text/plain\r\n\
Content-Length: 21\r\n\
Connection: close\r\n\
\r\n\
no backend available\n";

/// Accepts connections and dispatches forwarding sessions.
pub struct Listener<P> {
    listener: TcpListener,
    selector: Arc<Selector<P>>,
    connect_timeout: Duration,
    shutdown_grace: Duration,
}

impl<P: Probe + 'static> Listener<P> {
    /// Bind the configured listen address.
    ///
    /// A bind failure is the one startup-fatal condition; callers propagate
    /// it and exit.
    pub async fn bind(config: &ProxyConfig, selector: Arc<Selector<P>>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.listen).await?;

        info!(listen = %config.listen, strategy = ?config.strategy, "listener bound");

        Ok(Self {
            listener,
            selector,
            connect_timeout: config.connect_timeout,
            shutdown_grace: config.shutdown_grace,
        })
    }

    /// The bound local address (useful when listening on port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown, then drain in-flight sessions.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!("listener accepting connections");

        let mut sessions: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, client_addr)) => {
                            let selector = Arc::clone(&self.selector);
                            let connect_timeout = self.connect_timeout;
                            let session_id = SessionId::next();
                            sessions.spawn(handle_connection(
                                stream,
                                client_addr,
                                selector,
                                connect_timeout,
                                session_id,
                            ));
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }

                // Reap finished sessions so the set does not grow unbounded
                Some(_) = sessions.join_next(), if !sessions.is_empty() => {}

                _ = shutdown.recv() => {
                    info!("listener shutting down");
                    break;
                }
            }
        }

        // Stop accepting before draining
        drop(self.listener);

        if sessions.is_empty() {
            return;
        }

        info!(
            in_flight = sessions.len(),
            grace = ?self.shutdown_grace,
            "draining forwarding sessions"
        );

        let drain = async {
            while sessions.join_next().await.is_some() {}
        };

        if tokio::time::timeout(self.shutdown_grace, drain).await.is_err() {
            warn!(
                remaining = sessions.len(),
                "grace period elapsed, aborting remaining sessions"
            );
            sessions.shutdown().await;
        }
    }
}

/// Handle one accepted connection: select, then forward or reply 503.
///
/// Session failures are logged and contained here; they never reach the
/// accept loop or other sessions.
async fn handle_connection<P: Probe>(
    stream: TcpStream,
    client_addr: SocketAddr,
    selector: Arc<Selector<P>>,
    connect_timeout: Duration,
    session_id: SessionId,
) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!(error = %e, "failed to set TCP_NODELAY on client connection");
    }

    let start = Instant::now();

    let Some(endpoint) = selector.select().await else {
        info!(
            session = %session_id,
            client = %client_addr,
            "no live backend, replying 503"
        );
        write_unavailable(stream).await;
        return;
    };

    info!(
        session = %session_id,
        client = %client_addr,
        backend = %endpoint,
        "forwarding session starting"
    );

    match forward(stream, &endpoint, connect_timeout).await {
        Ok(result) => {
            info!(
                session = %session_id,
                client = %client_addr,
                backend = %endpoint,
                bytes_to_backend = result.bytes_to_backend,
                bytes_to_client = result.bytes_to_client,
                duration_ms = start.elapsed().as_millis(),
                "forwarding session completed"
            );
        }
        Err(e) => {
            warn!(
                session = %session_id,
                client = %client_addr,
                backend = %endpoint,
                duration_ms = start.elapsed().as_millis(),
                error = %e,
                "forwarding session failed"
            );
        }
    }
}

/// Write the synthesized unavailable response and close the connection.
async fn write_unavailable(mut stream: TcpStream) {
    if let Err(e) = stream.write_all(UNAVAILABLE_RESPONSE).await {
        debug!(error = %e, "failed to write unavailable response");
        return;
    }
    let _ = stream.shutdown().await;
}
