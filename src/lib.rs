//! # framecache
//!
//! Fetches a remote JPEG into a local cache once, then streams it onto a
//! bounded display surface tile by tile.
//!
//! ## Features
//!
//! - **Cache-or-fetch**: a resource is downloaded only when its cache entry is
//!   missing; a committed entry is never re-fetched or overwritten
//! - **Chunked streaming download**: bodies are copied in small bounded reads,
//!   yielding to the scheduler whenever no data is available
//! - **All-or-nothing entries**: downloads are staged and only committed once
//!   complete, so a dropped connection never leaves a truncated entry behind
//! - **Tile streaming renderer**: decoded MCU tiles are forwarded to an output
//!   sink until one starts below the visible surface
//!
//! ## Architecture
//!
//! - [`fetch`] - Cache-or-fetch resolver and download sessions
//! - [`io`] - Transport and byte source traits, HTTP implementation
//! - [`store`] - Persistent store trait and filesystem implementation
//! - [`render`] - Tiles, output sinks, the tile renderer and a framebuffer
//! - [`decode`] - JPEG block decoder driving the tile callback
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use framecache::{BlockDecoder, Framebuffer, FsStore, HttpTransport, Resolver};
//! use framecache::{ResourceDescriptor, TileRenderer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = Resolver::new(HttpTransport::new()?, FsStore::open("cache").await?);
//!     let descriptor = ResourceDescriptor::from_url("http://192.168.1.185:8080/captured.jpg")?;
//!
//!     if resolver.resolve(&descriptor).await.is_available() {
//!         let jpeg = resolver.open(&descriptor).await?;
//!         let mut renderer = TileRenderer::new(Framebuffer::new(240, 320));
//!         BlockDecoder::new().draw(&jpeg, 0, 0, &mut renderer)?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod io;
pub mod render;
pub mod store;

// Re-export commonly used types
pub use config::{Cli, Command, FetchConfig, InfoConfig, OutputFormat, ShowConfig};
pub use decode::{is_valid_scale, BlockDecoder, DrawSummary, DEFAULT_BLOCK_SIZE, VALID_SCALES};
pub use error::{DecodeError, FetchError, IoError, SnapshotError, StoreError};
pub use fetch::{DownloadSession, Outcome, Resolver, ResourceDescriptor, DEFAULT_CHUNK_SIZE};
pub use io::{ByteSource, FetchResponse, HttpBodySource, HttpTransport, Transport};
pub use render::{
    FnTileSink, Framebuffer, OutputSink, SurfaceBounds, Tile, TileRenderer, TileSink,
    DEFAULT_SNAPSHOT_QUALITY,
};
pub use store::{EntryWriter, FsEntryWriter, FsStore, PersistentStore};
