//! Integration tests for relayd.
//!
//! These drive the full proxy through real sockets: backend banner/echo
//! servers, a bound listener, and plain TCP clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use relayd::backend::strategy::make_strategy;
use relayd::backend::{BackendEndpoint, BackendRegistry, Selector};
use relayd::config::{ProxyConfig, StrategyKind};
use relayd::health::TcpProber;
use relayd::listener::Listener;
use relayd::util::ShutdownSignal;

/// Backend that greets every connection with a fixed banner and closes.
///
/// Probe connections receive the banner too and simply drop it.
async fn start_banner_backend(banner: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let _ = stream.write_all(banner.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    addr
}

/// Backend that echoes every chunk it reads until the peer half-closes.
async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if stream.write_all(&buf[..n]).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    addr
}

/// Backend that accepts connections and drops them immediately.
async fn start_abrupt_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            drop(stream);
        }
    });

    addr
}

/// Reserve a port nothing is listening on.
async fn dead_backend_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Start the proxy over the given backends and return its address, the
/// shutdown handle, and the listener task.
async fn start_proxy(
    backends: &[SocketAddr],
    strategy: StrategyKind,
) -> (SocketAddr, ShutdownSignal, JoinHandle<()>) {
    let endpoints = backends
        .iter()
        .map(|addr| BackendEndpoint::new(addr.ip().to_string(), addr.port()))
        .collect();

    let config = ProxyConfig {
        listen: "127.0.0.1:0".parse().unwrap(),
        strategy,
        probe_timeout: Duration::from_millis(500),
        connect_timeout: Duration::from_millis(500),
        shutdown_grace: Duration::from_secs(5),
    };

    let registry = Arc::new(BackendRegistry::new(endpoints));
    let prober = TcpProber::new(config.probe_timeout);
    let selector = Arc::new(Selector::new(registry, make_strategy(strategy), prober));

    let listener = Listener::bind(&config, selector).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let signal = ShutdownSignal::new();
    let handle = tokio::spawn(listener.run(signal.subscribe()));

    (addr, signal, handle)
}

/// Connect to the proxy and read everything the session delivers.
async fn fetch(proxy: SocketAddr) -> Vec<u8> {
    let mut client = TcpStream::connect(proxy).await.unwrap();
    client.shutdown().await.unwrap();

    let mut reply = Vec::new();
    client.read_to_end(&mut reply).await.unwrap();
    reply
}

#[tokio::test]
async fn test_round_robin_fans_out_across_backends() {
    let alpha = start_banner_backend("alpha\n").await;
    let beta = start_banner_backend("beta\n").await;

    let (proxy, signal, handle) = start_proxy(&[alpha, beta], StrategyKind::RoundRobin).await;

    let mut replies = Vec::new();
    for _ in 0..4 {
        replies.push(fetch(proxy).await);
    }

    assert_eq!(replies[0], b"alpha\n");
    assert_eq!(replies[1], b"beta\n");
    assert_eq!(replies[2], b"alpha\n");
    assert_eq!(replies[3], b"beta\n");

    signal.shutdown();
    let _ = handle.await;
}

#[tokio::test]
async fn test_dead_backend_is_skipped() {
    // Registry = [A(dead), B(alive), C(alive)], round-robin.
    let a = dead_backend_addr().await;
    let b = start_banner_backend("b\n").await;
    let c = start_banner_backend("c\n").await;

    let (proxy, signal, handle) = start_proxy(&[a, b, c], StrategyKind::RoundRobin).await;

    // First connection skips A; second lands on C; third wraps past A again.
    assert_eq!(fetch(proxy).await, b"b\n");
    assert_eq!(fetch(proxy).await, b"c\n");
    assert_eq!(fetch(proxy).await, b"b\n");

    signal.shutdown();
    let _ = handle.await;
}

#[tokio::test]
async fn test_all_dead_yields_unavailable_response() {
    let a = dead_backend_addr().await;
    let b = dead_backend_addr().await;

    let (proxy, signal, handle) = start_proxy(&[a, b], StrategyKind::RoundRobin).await;

    let reply = fetch(proxy).await;
    let text = String::from_utf8(reply).unwrap();

    // An explicit, well-formed failure, never a bare reset
    assert!(text.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
    assert!(text.contains("Connection: close"));
    assert!(text.ends_with("\r\n\r\nno backend available\n"));

    signal.shutdown();
    let _ = handle.await;
}

#[tokio::test]
async fn test_random_strategy_serves_from_registry() {
    let alpha = start_banner_backend("alpha\n").await;
    let beta = start_banner_backend("beta\n").await;

    let (proxy, signal, handle) = start_proxy(&[alpha, beta], StrategyKind::Random).await;

    for _ in 0..8 {
        let reply = fetch(proxy).await;
        assert!(reply == b"alpha\n" || reply == b"beta\n");
    }

    signal.shutdown();
    let _ = handle.await;
}

#[tokio::test]
async fn test_session_isolation() {
    // Round-robin over [echo, abrupt]: the long-lived echo session must
    // survive another session's backend dropping its connection.
    let echo = start_echo_backend().await;
    let abrupt = start_abrupt_backend().await;

    let (proxy, signal, handle) = start_proxy(&[echo, abrupt], StrategyKind::RoundRobin).await;

    // First connection lands on the echo backend and stays open
    let mut long_lived = TcpStream::connect(proxy).await.unwrap();
    long_lived.write_all(b"one").await.unwrap();
    let mut buf = [0u8; 3];
    long_lived.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"one");

    // Second connection lands on the abrupt backend and dies
    let mut doomed = TcpStream::connect(proxy).await.unwrap();
    doomed.shutdown().await.unwrap();
    let mut reply = Vec::new();
    // EOF or reset, but no data either way
    let _ = doomed.read_to_end(&mut reply).await;
    assert!(reply.is_empty());

    // The long-lived session is unaffected
    long_lived.write_all(b"two").await.unwrap();
    long_lived.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"two");

    long_lived.shutdown().await.unwrap();

    signal.shutdown();
    let _ = handle.await;
}

#[tokio::test]
async fn test_backend_recovery_is_immediate() {
    // A backend that is down for one connection and back for the next
    let addr = dead_backend_addr().await;

    let (proxy, signal, handle) = start_proxy(&[addr], StrategyKind::RoundRobin).await;

    let reply = String::from_utf8(fetch(proxy).await).unwrap();
    assert!(reply.starts_with("HTTP/1.1 503"));

    // Backend comes up on the same port; no cached staleness
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let _ = stream.write_all(b"back\n").await;
                let _ = stream.shutdown().await;
            });
        }
    });

    assert_eq!(fetch(proxy).await, b"back\n");

    signal.shutdown();
    let _ = handle.await;
}

#[tokio::test]
async fn test_shutdown_drains_in_flight_sessions() {
    let echo = start_echo_backend().await;

    let (proxy, signal, handle) = start_proxy(&[echo], StrategyKind::RoundRobin).await;

    // Open a session before shutdown
    let mut client = TcpStream::connect(proxy).await.unwrap();
    client.write_all(b"before").await.unwrap();
    let mut buf = [0u8; 6];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"before");

    signal.shutdown();

    // The in-flight session keeps working while the listener drains
    client.write_all(b"during").await.unwrap();
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"during");

    client.shutdown().await.unwrap();
    drop(client);

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("listener did not drain and stop")
        .unwrap();

    // New connections are no longer accepted
    assert!(TcpStream::connect(proxy).await.is_err());
}
