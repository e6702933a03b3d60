//! Cache-or-fetch resolution.
//!
//! ```text
//! resolve(descriptor)
//!   │
//!   ├─ store.exists(key)?           ── yes ──► AlreadyCached
//!   ├─ transport.is_reachable()?    ── no ───► FetchFailed(NotConnected)
//!   ├─ transport.get(url)
//!   │    ├─ error                   ─────────► FetchFailed(Connection)
//!   │    └─ status not 2xx          ─────────► FetchFailed(RemoteError)
//!   ├─ store.open_for_append(key)   ── err ──► FetchFailed(LocalWriteError)
//!   ├─ drain body in chunks
//!   └─ close, verify length
//!        ├─ ok   → commit  ──────────────────► Fetched
//!        └─ err  → discard ──────────────────► FetchFailed(..)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::ResourceDescriptor;
use crate::error::{FetchError, StoreError};
use crate::io::{ByteSource, FetchResponse, Transport};
use crate::store::{EntryWriter, PersistentStore};

/// Default number of bytes moved per read.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

// =============================================================================
// Outcome
// =============================================================================

/// Result of resolving a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The entry was already in the store; nothing was downloaded.
    AlreadyCached,

    /// The entry was downloaded and committed.
    Fetched {
        /// Bytes written to the store
        bytes: u64,
    },

    /// The entry is still absent.
    FetchFailed(FetchError),
}

impl Outcome {
    /// Whether a readable local copy exists after this resolution.
    pub fn is_available(&self) -> bool {
        !matches!(self, Outcome::FetchFailed(_))
    }

    /// Whether this resolution performed a download.
    pub fn was_fetched(&self) -> bool {
        matches!(self, Outcome::Fetched { .. })
    }
}

// =============================================================================
// Download Session
// =============================================================================

/// State of one in-progress download.
///
/// Owns the body stream and the write handle; both are released when the
/// session is finished or dropped.
pub struct DownloadSession<S, W> {
    source: S,
    writer: W,
    /// Declared body length, `None` when unknown
    declared: Option<u64>,
    /// Bytes still expected, `None` when unknown
    remaining: Option<u64>,
    written: u64,
    chunk_size: usize,
}

impl<S: ByteSource, W: EntryWriter> DownloadSession<S, W> {
    /// Start a session for a body of `declared` bytes.
    pub fn new(source: S, writer: W, declared: Option<u64>, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        Self {
            source,
            writer,
            declared,
            remaining: declared,
            written: 0,
            chunk_size,
        }
    }

    /// Bytes copied into the store so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Bytes still expected, or `None` if the length is unknown.
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    fn wants_more(&self) -> bool {
        self.source.is_connected() && self.remaining.map_or(true, |left| left > 0)
    }

    /// Copy the body into the write handle until the declared length is
    /// reached or the stream closes.
    ///
    /// Zero-byte reads yield to the scheduler before retrying.
    pub async fn drain(&mut self) -> Result<(), FetchError> {
        let mut buf = vec![0u8; self.chunk_size];

        while self.wants_more() {
            let mut want = self.chunk_size;
            let available = self.source.available();
            if available > 0 {
                want = want.min(available);
            }
            if let Some(left) = self.remaining {
                want = left.min(want as u64) as usize;
            }

            let count = self.source.read_up_to(&mut buf[..want]).await?;
            if count == 0 {
                tokio::task::yield_now().await;
                continue;
            }

            let stored = self.writer.write(&buf[..count]).await?;
            if stored != count {
                return Err(FetchError::LocalWriteError(format!(
                    "short write: {} of {} bytes",
                    stored, count
                )));
            }

            self.written += count as u64;
            if let Some(left) = self.remaining.as_mut() {
                *left = left.saturating_sub(count as u64);
            }
        }

        Ok(())
    }

    /// Close the write handle and check the byte count against the declared
    /// length.
    pub async fn finish(self) -> Result<u64, FetchError> {
        let written = self.written;
        self.writer.close().await?;

        match self.declared {
            Some(expected) if expected != written => {
                Err(FetchError::Truncated { expected, written })
            }
            _ => Ok(written),
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Makes remote resources available in a local store, downloading only on
/// a cache miss.
///
/// A committed entry is never re-fetched or overwritten. Concurrent
/// resolutions of the same cache key are serialized, so the later one sees
/// the entry the earlier one committed.
///
/// # Example
///
/// ```ignore
/// use framecache::fetch::{Resolver, ResourceDescriptor};
/// use framecache::io::HttpTransport;
/// use framecache::store::FsStore;
///
/// let resolver = Resolver::new(HttpTransport::new()?, FsStore::open("cache").await?);
/// let descriptor = ResourceDescriptor::from_url("http://192.168.1.185:8080/captured.jpg")?;
///
/// match resolver.resolve(&descriptor).await {
///     Outcome::FetchFailed(e) => eprintln!("download failed: {}", e),
///     _ => { let jpeg = resolver.open(&descriptor).await?; }
/// }
/// ```
pub struct Resolver<T: Transport, P: PersistentStore> {
    transport: T,
    store: P,
    chunk_size: usize,
    /// Per-key locks for resolutions in progress
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<T: Transport, P: PersistentStore> Resolver<T, P> {
    /// Create a resolver with the default chunk size (128 bytes).
    pub fn new(transport: T, store: P) -> Self {
        Self::with_chunk_size(transport, store, DEFAULT_CHUNK_SIZE)
    }

    /// Create a resolver that moves at most `chunk_size` bytes per read.
    ///
    /// # Panics
    /// Panics if `chunk_size` is zero.
    pub fn with_chunk_size(transport: T, store: P, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be non-zero");
        Self {
            transport,
            store,
            chunk_size,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &P {
        &self.store
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Read a resolved entry back from the store.
    pub async fn open(&self, descriptor: &ResourceDescriptor) -> Result<Bytes, StoreError> {
        self.store.open_for_read(&descriptor.cache_key).await
    }

    /// Ensure a local copy of `descriptor` exists.
    ///
    /// Never returns an error directly: every failure is reported as
    /// [`Outcome::FetchFailed`] and leaves the entry absent.
    pub async fn resolve(&self, descriptor: &ResourceDescriptor) -> Outcome {
        // Spellings the store treats as one entry must share one lock.
        let lock_key = self.store.canonical_key(&descriptor.cache_key);
        let key_lock = self.acquire_key(&lock_key).await;

        let outcome = {
            let _guard = key_lock.lock().await;
            self.resolve_exclusive(descriptor).await
        };

        self.release_key(&lock_key, key_lock).await;
        outcome
    }

    async fn acquire_key(&self, key: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().await;
        in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn release_key(&self, key: &str, key_lock: Arc<Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().await;
        drop(key_lock);

        // Only the map's own reference left: nobody else is waiting.
        let idle = in_flight
            .get(key)
            .map(|lock| Arc::strong_count(lock) == 1)
            .unwrap_or(false);
        if idle {
            in_flight.remove(key);
        }
    }

    async fn resolve_exclusive(&self, descriptor: &ResourceDescriptor) -> Outcome {
        let key = descriptor.cache_key.as_str();
        let url = descriptor.url.as_str();

        if self.store.exists(key).await {
            info!("Found {}", key);
            return Outcome::AlreadyCached;
        }

        info!("Downloading {} from {}", key, url);

        if !self.transport.is_reachable(url).await {
            warn!("Network not reachable, skipping download of {}", key);
            return Outcome::FetchFailed(FetchError::NotConnected);
        }

        let response = match self.transport.get(url).await {
            Ok(response) => response,
            Err(e) => {
                error!("GET {} failed: {}", url, e);
                return Outcome::FetchFailed(e.into());
            }
        };

        debug!("GET {} -> {}", url, response.status);

        if !response.is_success() {
            warn!("GET {} failed with status {}", url, response.status);
            return Outcome::FetchFailed(FetchError::RemoteError {
                status: response.status,
            });
        }

        let writer = match self.store.open_for_append(key).await {
            Ok(writer) => writer,
            Err(e) => {
                error!("Failed to open {} for writing: {}", key, e);
                return Outcome::FetchFailed(FetchError::LocalWriteError(e.to_string()));
            }
        };

        let FetchResponse {
            content_length,
            body,
            ..
        } = response;

        let mut session = DownloadSession::new(body, writer, content_length, self.chunk_size);
        let drained = session.drain().await;
        let finished = session.finish().await;

        match drained.and(finished) {
            Ok(bytes) => match self.store.commit(key).await {
                Ok(()) => {
                    info!("Connection closed or file end: stored {} bytes in {}", bytes, key);
                    Outcome::Fetched { bytes }
                }
                Err(e) => {
                    error!("Failed to commit {}: {}", key, e);
                    self.discard(key).await;
                    Outcome::FetchFailed(FetchError::LocalWriteError(e.to_string()))
                }
            },
            Err(e) => {
                warn!("Download of {} failed: {}", key, e);
                self.discard(key).await;
                Outcome::FetchFailed(e)
            }
        }
    }

    async fn discard(&self, key: &str) {
        if let Err(e) = self.store.discard(key).await {
            warn!("Failed to discard partial entry {}: {}", key, e);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
