//! Storage backends.

pub mod filesystem;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// One stored object as seen by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

/// Storage backend trait.
///
/// Keys are flat names. Writers are not coordinated: two `put`s of the same
/// key race and the last one wins.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store content under the given key, replacing any existing object
    async fn put(&self, key: &str, content: Bytes) -> Result<()>;

    /// Retrieve content by key; `AppError::NotFound` when absent
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete content by key
    async fn delete(&self, key: &str) -> Result<()>;

    /// Enumerate every stored object with its last modification time
    async fn list(&self) -> Result<Vec<StoredObject>>;

    /// Human-readable location of a key (a path for filesystem storage)
    fn location(&self, key: &str) -> String;
}
