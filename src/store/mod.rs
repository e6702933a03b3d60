//! Persistent storage for resolved resources.
//!
//! Entries are keyed by an opaque cache key. Writes go to a staging area and
//! only become visible to [`PersistentStore::exists`] once committed, so a
//! store never holds an entry that looks complete but is not.
//!
//! ```text
//!   open_for_append ──► write … write ──► close ──┬──► commit   (entry visible)
//!                                                 └──► discard  (entry absent)
//! ```

mod fs;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreError;

pub use fs::{FsEntryWriter, FsStore, STAGING_SUFFIX};

/// Trait for durable local storage keyed by name.
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// The write handle type returned by [`open_for_append`](Self::open_for_append).
    type Writer: EntryWriter + 'static;

    /// Canonical spelling of `key`.
    ///
    /// Keys with the same canonical form name the same entry. The default
    /// treats every key as distinct.
    fn canonical_key(&self, key: &str) -> String {
        key.to_string()
    }

    /// Whether a committed entry exists under `key`.
    async fn exists(&self, key: &str) -> bool;

    /// Open a fresh staging entry for `key`; every write appends to it.
    async fn open_for_append(&self, key: &str) -> Result<Self::Writer, StoreError>;

    /// Read a committed entry in full.
    async fn open_for_read(&self, key: &str) -> Result<Bytes, StoreError>;

    /// Publish the staged entry for `key` as complete.
    async fn commit(&self, key: &str) -> Result<(), StoreError>;

    /// Throw away the staged entry for `key`, if any.
    async fn discard(&self, key: &str) -> Result<(), StoreError>;

    /// Delete a committed entry. Returns `false` if there was none.
    async fn remove(&self, key: &str) -> Result<bool, StoreError>;
}

/// Open write handle on a staged entry.
#[async_trait]
pub trait EntryWriter: Send {
    /// Append `data` to the entry and return the number of bytes written.
    async fn write(&mut self, data: &[u8]) -> Result<usize, StoreError>;

    /// Flush and close the handle. Returns the total bytes written.
    async fn close(self) -> Result<u64, StoreError>;
}
