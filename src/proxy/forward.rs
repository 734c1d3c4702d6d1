//! Forwarding sessions.
//!
//! Streams bytes between an accepted client connection and a chosen
//! backend. Each direction runs independently and half-closes its write
//! side when its read side reaches end-of-stream; the session ends when
//! both directions have completed or either leg errors.

use crate::backend::BackendEndpoint;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Byte counters for a completed forwarding session.
#[derive(Debug)]
pub struct ProxyResult {
    /// Bytes sent from client to backend.
    pub bytes_to_backend: u64,
    /// Bytes sent from backend to client.
    pub bytes_to_client: u64,
}

/// Forwarding session error.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("failed to connect to backend {0}: {1}")]
    BackendConnect(BackendEndpoint, io::Error),

    #[error("connection timeout to backend {0}")]
    BackendTimeout(BackendEndpoint),

    #[error("session error: {0}")]
    Session(#[from] io::Error),
}

/// Connect to a backend endpoint with a bounded timeout.
///
/// Always opens a fresh connection; the selector's probe connection is a
/// liveness check, never reused for forwarding.
pub async fn connect_to_backend(
    endpoint: &BackendEndpoint,
    connect_timeout: Duration,
) -> Result<TcpStream, ForwardError> {
    debug!(backend = %endpoint, "connecting to backend");

    match timeout(
        connect_timeout,
        TcpStream::connect((endpoint.host.as_str(), endpoint.port)),
    )
    .await
    {
        Ok(Ok(stream)) => {
            // TCP_NODELAY for lower latency
            if let Err(e) = stream.set_nodelay(true) {
                warn!(error = %e, "failed to set TCP_NODELAY on backend connection");
            }
            Ok(stream)
        }
        Ok(Err(e)) => Err(ForwardError::BackendConnect(endpoint.clone(), e)),
        Err(_) => Err(ForwardError::BackendTimeout(endpoint.clone())),
    }
}

/// Copy bytes bidirectionally between two streams.
///
/// Each direction shuts down its write side when its read side hits EOF.
/// The first I/O error on either leg ends the session; both sockets are
/// closed when the streams drop.
pub async fn copy_bidirectional<C, B>(client: C, backend: B) -> Result<ProxyResult, ForwardError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut backend_read, mut backend_write) = tokio::io::split(backend);

    let client_to_backend = async {
        let n = tokio::io::copy(&mut client_read, &mut backend_write).await?;
        backend_write.shutdown().await?;
        Ok::<u64, io::Error>(n)
    };

    let backend_to_client = async {
        let n = tokio::io::copy(&mut backend_read, &mut client_write).await?;
        client_write.shutdown().await?;
        Ok::<u64, io::Error>(n)
    };

    let (bytes_to_backend, bytes_to_client) =
        tokio::try_join!(client_to_backend, backend_to_client)?;

    debug!(bytes_to_backend, bytes_to_client, "session streams closed");

    Ok(ProxyResult {
        bytes_to_backend,
        bytes_to_client,
    })
}

/// Run one complete forwarding session: connect to the backend, then relay
/// bytes both ways until the session ends.
pub async fn forward(
    client_stream: TcpStream,
    endpoint: &BackendEndpoint,
    connect_timeout: Duration,
) -> Result<ProxyResult, ForwardError> {
    let backend_stream = connect_to_backend(endpoint, connect_timeout).await?;
    copy_bidirectional(client_stream, backend_stream).await
}
