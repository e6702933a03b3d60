//! Test utilities for integration tests.
//!
//! This module provides local HTTP servers to fetch from and helpers for
//! creating test JPEGs and cache directories.

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use framecache::{FsStore, HttpTransport, Resolver};

// =============================================================================
// Image Server
// =============================================================================

/// An axum server on an ephemeral port serving fixed bodies.
///
/// Every response carries a `Content-Length`. Unknown paths return 404.
pub struct ImageServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl ImageServer {
    /// Start a server on the IPv4 loopback with one route per `(path, body)` pair.
    pub async fn start(routes: Vec<(&str, Vec<u8>)>) -> Self {
        Self::start_on("127.0.0.1:0", routes).await.unwrap()
    }

    /// Start a server bound to `bind`, e.g. `[::1]:0`.
    ///
    /// Fails if the address cannot be bound, such as on hosts without IPv6.
    pub async fn start_on(bind: &str, routes: Vec<(&str, Vec<u8>)>) -> std::io::Result<Self> {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut app = Router::new();

        for (path, body) in routes {
            let body = Bytes::from(body);
            let hits = Arc::clone(&hits);
            app = app.route(
                path,
                get(move || {
                    let body = body.clone();
                    let hits = Arc::clone(&hits);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        body
                    }
                }),
            );
        }

        let listener = TcpListener::bind(bind).await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Ok(Self { addr, hits })
    }

    /// URL for `path`; `SocketAddr` formatting brackets IPv6 hosts.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of requests that reached a known route.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Raw Server
// =============================================================================

/// A bare TCP server that answers every request with a scripted response.
///
/// The response is written in the given pieces with a short pause between
/// them, then the connection is closed. This allows chunked bodies with no
/// `Content-Length` and bodies that end before their declared length.
pub struct RawServer {
    addr: SocketAddr,
}

impl RawServer {
    pub async fn start(pieces: Vec<Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let pieces = Arc::new(pieces);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let pieces = Arc::clone(&pieces);
                tokio::spawn(async move {
                    // Reachability probes connect and close without a request.
                    if !read_request_head(&mut socket).await {
                        return;
                    }
                    for piece in pieces.iter() {
                        if socket.write_all(piece).await.is_err() {
                            return;
                        }
                        let _ = socket.flush().await;
                        tokio::time::sleep(Duration::from_millis(20)).await;
                    }
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { addr }
    }

    /// A chunked response whose body is split into the given chunks.
    pub async fn chunked(chunks: Vec<Vec<u8>>) -> Self {
        let mut pieces =
            vec![b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
                .to_vec()];
        for chunk in chunks {
            let mut piece = format!("{:x}\r\n", chunk.len()).into_bytes();
            piece.extend_from_slice(&chunk);
            piece.extend_from_slice(b"\r\n");
            pieces.push(piece);
        }
        pieces.push(b"0\r\n\r\n".to_vec());
        Self::start(pieces).await
    }

    /// A response declaring `declared` bytes that sends only `body`.
    pub async fn truncated(declared: usize, body: Vec<u8>) -> Self {
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            declared
        );
        Self::start(vec![head.into_bytes(), body]).await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Read until the end of the request head. Returns false if the peer
/// closed before sending one.
async fn read_request_head(socket: &mut tokio::net::TcpStream) -> bool {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return false,
            Ok(n) => {
                head.extend_from_slice(&buf[..n]);
                if head.windows(4).any(|w| w == b"\r\n\r\n") {
                    return true;
                }
            }
        }
    }
}

/// A URL on a local port nothing listens on.
pub async fn unreachable_url(path: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}{}", addr, path)
}

// =============================================================================
// Fixtures
// =============================================================================

/// Create a solid-colour baseline JPEG.
pub fn create_test_jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut output = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut output, 95)
        .encode_image(&image)
        .unwrap();
    output.into_inner()
}

/// Deterministic non-repeating payload.
pub fn create_payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}

/// Resolver backed by a real HTTP transport and a fresh cache directory.
pub async fn create_resolver() -> (TempDir, Resolver<HttpTransport, FsStore>) {
    let dir = TempDir::new().unwrap();
    let store = FsStore::open(dir.path()).await.unwrap();
    let transport =
        HttpTransport::with_timeouts(Duration::from_secs(2), Duration::from_millis(500)).unwrap();
    (dir, Resolver::new(transport, store))
}

/// Whether any staged (uncommitted) file remains in the cache directory.
pub fn has_staged_files(dir: &TempDir) -> bool {
    std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .any(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .ends_with(framecache::store::STAGING_SUFFIX)
        })
}
