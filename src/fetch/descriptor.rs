use sha2::{Digest, Sha256};
use url::Url;

use crate::error::IoError;

/// A remote locator paired with the local cache key it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceDescriptor {
    /// Remote locator (an HTTP URL)
    pub url: String,

    /// Name of the entry in the persistent store
    pub cache_key: String,
}

impl ResourceDescriptor {
    /// Pair a locator with an explicit cache key.
    pub fn new(url: impl Into<String>, cache_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cache_key: cache_key.into(),
        }
    }

    /// Derive the cache key from the locator.
    ///
    /// The last path segment becomes the key, e.g.
    /// `http://host/images/captured.jpg` maps to `/captured.jpg`. Locators
    /// without a usable file name fall back to a SHA-256 digest of the URL.
    pub fn from_url(url: impl Into<String>) -> Result<Self, IoError> {
        let url = url.into();
        let parsed =
            Url::parse(&url).map_err(|e| IoError::InvalidUrl(format!("{}: {}", url, e)))?;

        let cache_key = file_name_key(&parsed).unwrap_or_else(|| digest_key(&url));

        Ok(Self { url, cache_key })
    }
}

fn file_name_key(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let name = urlencoding::decode(segment).ok()?;

    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return None;
    }

    Some(format!("/{}", name))
}

fn digest_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    format!("/{}.jpg", hex::encode(digest))
}
