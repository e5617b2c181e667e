//! Loopback HTTP server helpers for fetch and pipeline tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Request totals and the high-water mark of simultaneous connections.
#[derive(Debug, Default)]
pub struct ServerStats {
    pub requests: AtomicUsize,
    current: AtomicUsize,
    pub max_concurrent: AtomicUsize,
}

/// Serve `body` as HTTP 200 for every request, sleeping `delay` before
/// responding. Each connection is closed after one response, so in-flight
/// connections equal in-flight requests.
pub async fn spawn_http_server(body: &'static str, delay: Duration) -> (SocketAddr, Arc<ServerStats>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
    let addr = listener.local_addr().expect("local addr");
    let stats = Arc::new(ServerStats::default());
    let server_stats = stats.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let stats = server_stats.clone();
            tokio::spawn(async move {
                stats.requests.fetch_add(1, Ordering::SeqCst);
                let now = stats.current.fetch_add(1, Ordering::SeqCst) + 1;
                stats.max_concurrent.fetch_max(now, Ordering::SeqCst);

                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                tokio::time::sleep(delay).await;

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;

                stats.current.fetch_sub(1, Ordering::SeqCst);
            });
        }
    });

    (addr, stats)
}
