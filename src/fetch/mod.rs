//! Cache-or-fetch resource resolution.
//!
//! # Components
//!
//! - [`ResourceDescriptor`]: a remote locator paired with its cache key
//! - [`Resolver`]: guarantees a local copy exists, downloading on a miss
//! - [`DownloadSession`]: drains one response body into a store entry
//! - [`Outcome`]: what a resolution did
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                 Resolver                 │
//! │   exists? ──► reachable? ──► GET ──►     │
//! │              DownloadSession (128 B)     │
//! └───────┬──────────────────────────┬───────┘
//!         │                          │
//!         ▼                          ▼
//! ┌────────────────┐        ┌────────────────┐
//! │   Transport    │        │ PersistentStore│
//! │  (ByteSource)  │        │  (EntryWriter) │
//! └────────────────┘        └────────────────┘
//! ```

mod descriptor;
mod resolver;

pub use descriptor::ResourceDescriptor;
pub use resolver::{DownloadSession, Outcome, Resolver, DEFAULT_CHUNK_SIZE};
