use async_trait::async_trait;

use crate::error::IoError;

/// Trait for draining an open network body in bounded chunks.
///
/// This abstraction lets the resolver copy a remote resource into the store
/// without holding the whole body in memory. A read of zero bytes means no
/// data is available right now; it only ends the transfer once
/// [`is_connected`](ByteSource::is_connected) also reports `false`.
#[async_trait]
pub trait ByteSource: Send {
    /// Number of bytes that can be read without waiting on the network.
    fn available(&self) -> usize;

    /// Read up to `buf.len()` bytes into `buf`.
    ///
    /// Waits until some bytes arrive or the stream ends. Returns the number
    /// of bytes copied.
    async fn read_up_to(&mut self, buf: &mut [u8]) -> Result<usize, IoError>;

    /// Whether more bytes may still arrive.
    fn is_connected(&self) -> bool;
}

/// Response metadata plus the body stream of a content request.
#[derive(Debug)]
pub struct FetchResponse<S> {
    /// HTTP status code
    pub status: u16,

    /// Declared body length. `None` when the server sent no length.
    pub content_length: Option<u64>,

    /// The body stream
    pub body: S,
}

impl<S> FetchResponse<S> {
    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        http::StatusCode::from_u16(self.status)
            .map(|status| status.is_success())
            .unwrap_or(false)
    }
}

/// Trait for opening content requests against remote locators.
///
/// Implementations must be thread-safe. Connection establishment and any
/// timeout or retry policy belong to the implementation.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The body stream type returned by [`get`](Transport::get).
    type Source: ByteSource + 'static;

    /// Readiness signal: can the host behind `url` be reached right now?
    async fn is_reachable(&self, url: &str) -> bool;

    /// Open a connection to `url` and issue a content request.
    ///
    /// Returns once the status line and headers have been received. The body
    /// has not been read yet.
    async fn get(&self, url: &str) -> Result<FetchResponse<Self::Source>, IoError>;
}
