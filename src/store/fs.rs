//! Filesystem-backed store.
//!
//! Cache keys are relative paths under a root directory; a leading `/` is
//! allowed so keys like `/fieldfare.jpg` work as-is. Staged data lives next
//! to the final file with a `.part` suffix and is renamed into place on
//! commit.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use super::{EntryWriter, PersistentStore};
use crate::error::StoreError;

/// Suffix appended to an entry's file name while it is being written.
pub const STAGING_SUFFIX: &str = ".part";

/// Path of the entry for `key`, relative to the store root.
///
/// A leading `/` and `.` components are dropped; `..`, empty keys and
/// staging file names are rejected.
fn relative_path(key: &str) -> Result<PathBuf, StoreError> {
    let mut relative = PathBuf::new();
    for component in Path::new(key.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return Err(StoreError::InvalidKey(key.to_string())),
        }
    }

    let is_staging_name = relative
        .file_name()
        .map(|name| name.to_string_lossy().ends_with(STAGING_SUFFIX))
        .unwrap_or(false);

    if relative.as_os_str().is_empty() || is_staging_name {
        return Err(StoreError::InvalidKey(key.to_string()));
    }

    Ok(relative)
}

/// Persistent store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that `key` names a valid entry without touching the filesystem.
    pub fn validate_key(key: &str) -> Result<(), StoreError> {
        relative_path(key).map(|_| ())
    }

    /// Map a cache key to its final file path.
    ///
    /// Rejects empty keys and keys that would escape the root.
    pub fn entry_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(relative_path(key)?))
    }

    fn staging_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let mut path = self.entry_path(key)?.into_os_string();
        path.push(STAGING_SUFFIX);
        Ok(PathBuf::from(path))
    }
}

#[async_trait]
impl PersistentStore for FsStore {
    type Writer = FsEntryWriter;

    /// `/a.jpg`, `a.jpg` and `./a.jpg` all map to `a.jpg`. Invalid keys are
    /// returned unchanged.
    fn canonical_key(&self, key: &str) -> String {
        match relative_path(key) {
            Ok(relative) => relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => key.to_string(),
        }
    }

    async fn exists(&self, key: &str) -> bool {
        let Ok(path) = self.entry_path(key) else {
            return false;
        };

        fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn open_for_append(&self, key: &str) -> Result<Self::Writer, StoreError> {
        let path = self.staging_path(key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Leftovers from an interrupted download are truncated away.
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .await?;

        Ok(FsEntryWriter {
            file: BufWriter::new(file),
            written: 0,
        })
    }

    async fn open_for_read(&self, key: &str) -> Result<Bytes, StoreError> {
        let path = self.entry_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn commit(&self, key: &str) -> Result<(), StoreError> {
        let staging = self.staging_path(key)?;
        let path = self.entry_path(key)?;
        match fs::rename(&staging, &path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn discard(&self, key: &str) -> Result<(), StoreError> {
        let staging = self.staging_path(key)?;
        match fs::remove_file(&staging).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Buffered write handle on a staged file.
pub struct FsEntryWriter {
    file: BufWriter<File>,
    written: u64,
}

#[async_trait]
impl EntryWriter for FsEntryWriter {
    async fn write(&mut self, data: &[u8]) -> Result<usize, StoreError> {
        self.file.write_all(data).await?;
        self.written += data.len() as u64;
        Ok(data.len())
    }

    async fn close(mut self) -> Result<u64, StoreError> {
        self.file.flush().await?;
        self.file.into_inner().sync_all().await?;
        Ok(self.written)
    }
}
