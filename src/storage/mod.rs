//! Content-addressed page storage.
//!
//! A page is stored under its owner's collection, keyed by a SHA-256 digest of
//! its content. Saving the same link twice for the same user lands in the same
//! slot, so collections never hold duplicates.

pub mod files;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Length of a hex-encoded SHA-256 identity.
pub const IDENTITY_LEN: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("can't calculate hash: {0}")]
    Hash(&'static str),
    #[error("no saved pages")]
    NoSavedPages,
    #[error("{context}: page not found")]
    NotFound {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid owner name {0:?}")]
    InvalidOwner(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Codec {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return StorageError::NotFound {
                context: context.into(),
                source,
            };
        }
        Self::raw_io(context, source)
    }

    /// Wrap without reclassifying: a missing file here is not a missing page.
    pub(crate) fn raw_io(context: impl Into<String>, source: std::io::Error) -> Self {
        StorageError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }

    pub fn is_no_saved_pages(&self) -> bool {
        matches!(self, StorageError::NoSavedPages)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub user_name: String,
}

impl Page {
    pub fn new(url: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_name: user_name.into(),
        }
    }

    /// Hex SHA-256 over the length-prefixed url and user name.
    ///
    /// The prefixes keep field boundaries unambiguous: `("ab", "c")` and
    /// `("a", "bc")` never collide.
    pub fn hash(&self) -> Result<String, StorageError> {
        if self.url.is_empty() {
            return Err(StorageError::Hash("page has no url"));
        }

        let mut hasher = Sha256::new();
        for field in [self.url.as_bytes(), self.user_name.as_bytes()] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field);
        }
        let digest = hasher.finalize();

        let mut out = String::with_capacity(IDENTITY_LEN);
        for b in digest.iter() {
            let _ = write!(&mut out, "{:02x}", b);
        }
        Ok(out)
    }
}

pub(crate) fn is_identity(name: &str) -> bool {
    name.len() == IDENTITY_LEN && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Owner names become directory names, so they must be one plain path component.
pub(crate) fn owner_dir(owner: &str) -> Result<PathBuf, StorageError> {
    let bad = owner.is_empty()
        || owner == "."
        || owner == ".."
        || owner.contains(['/', '\\', '\0']);
    if bad {
        return Err(StorageError::InvalidOwner(owner.to_string()));
    }
    Ok(PathBuf::from(owner))
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `page` in its owner's collection. Re-saving identical content is a no-op.
    async fn save(&self, page: &Page) -> Result<(), StorageError>;
    /// Uniformly random page from the owner's current collection.
    async fn pick_random(&self, user_name: &str) -> Result<Page, StorageError>;
    async fn remove(&self, page: &Page, user_name: &str) -> Result<(), StorageError>;
    /// `Ok(false)` for a page never saved; other failures are errors.
    async fn is_exists(&self, page: &Page, user_name: &str) -> Result<bool, StorageError>;
}
