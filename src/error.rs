use thiserror::Error;

/// I/O errors raised by the network transport and byte sources
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Could not open or keep a connection to the remote host
    #[error("Connection error: {0}")]
    Connection(String),

    /// The body stream failed mid-read
    #[error("Stream error: {0}")]
    Stream(String),

    /// The resource locator could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors raised by a persistent store
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// No committed entry exists under this key
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// The key cannot be mapped to a storage location
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Underlying filesystem failure
    #[error("Store I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Reasons a cache-or-fetch resolution can fail.
///
/// Every variant leaves the store without an entry for the key, so the next
/// resolution retries the download.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The network is not reachable
    #[error("Network not reachable")]
    NotConnected,

    /// The server answered with a non-success status
    #[error("Remote error: HTTP {status}")]
    RemoteError { status: u16 },

    /// The cache entry could not be opened or written
    #[error("Local write error: {0}")]
    LocalWriteError(String),

    /// Fewer (or more) bytes arrived than the server declared
    #[error("Truncated download: expected {expected} bytes, wrote {written}")]
    Truncated { expected: u64, written: u64 },

    /// The request could not be sent or the stream broke
    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<IoError> for FetchError {
    fn from(err: IoError) -> Self {
        FetchError::Connection(err.to_string())
    }
}

impl From<StoreError> for FetchError {
    fn from(err: StoreError) -> Self {
        FetchError::LocalWriteError(err.to_string())
    }
}

/// Errors raised while decoding a JPEG into tiles
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The source bytes are not a decodable JPEG
    #[error("Failed to decode JPEG: {message}")]
    Decode { message: String },

    /// Scale factor other than 1, 2, 4 or 8
    #[error("Invalid scale factor {0}: must be 1, 2, 4 or 8")]
    InvalidScale(u8),
}

/// Errors raised when writing a surface snapshot to disk
#[derive(Debug, Clone, Error)]
pub enum SnapshotError {
    /// JPEG encoding failed
    #[error("Failed to encode snapshot: {message}")]
    Encode { message: String },

    /// Writing the output file failed
    #[error("Snapshot I/O error: {0}")]
    Io(String),
}
