//! Filesystem storage backend.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{StorageBackend, StoredObject};
use crate::error::{AppError, Result};

/// Filesystem-based storage backend over a single flat directory
pub struct FilesystemStorage {
    base_path: PathBuf,
}

impl FilesystemStorage {
    /// Create new filesystem storage
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Create the storage directory if it does not exist yet.
    pub async fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }

    /// Get full path for a key. Keys that could escape the directory are rejected.
    fn key_to_path(&self, key: &str) -> Result<PathBuf> {
        if !is_flat_key(key) {
            return Err(AppError::NotFound(format!("No stored file named {:?}", key)));
        }
        Ok(self.base_path.join(key))
    }
}

/// A key is usable when it names a single entry directly inside the directory.
pub(crate) fn is_flat_key(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && key != ".."
        && !key.contains(['/', '\\', '\0'])
}

#[async_trait]
impl StorageBackend for FilesystemStorage {
    async fn put(&self, key: &str, content: Bytes) -> Result<()> {
        let path = self
            .key_to_path(key)
            .map_err(|_| AppError::Storage(format!("Invalid storage key {:?}", key)))?;

        let write = async {
            fs::create_dir_all(&self.base_path).await?;
            let mut file = fs::File::create(&path).await?;
            file.write_all(&content).await?;
            file.sync_all().await
        };
        write
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", key, e)))?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let path = self.key_to_path(key)?;
        match fs::read(&path).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("File not found: {}", key)))
            }
            Err(e) => Err(AppError::Storage(format!("Failed to read {}: {}", key, e))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self.key_to_path(key) {
            Ok(path) => Ok(fs::try_exists(&path).await?),
            Err(_) => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_to_path(key)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to delete {}: {}", key, e)))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<StoredObject>> {
        let mut entries = match fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let Ok(key) = entry.file_name().into_string() else {
                tracing::warn!(path = %entry.path().display(), "Skipping non UTF-8 file name");
                continue;
            };
            objects.push(StoredObject {
                key,
                size_bytes: metadata.len(),
                modified_at: DateTime::<Utc>::from(metadata.modified()?),
            });
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn location(&self, key: &str) -> String {
        self.base_path.join(key).display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());

        storage.put("a.pdf", Bytes::from_static(b"first")).await.unwrap();
        storage.put("a.pdf", Bytes::from_static(b"second")).await.unwrap();

        assert_eq!(storage.get("a.pdf").await.unwrap(), Bytes::from_static(b"second"));
        assert_eq!(storage.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());
        let err = storage.get("missing.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_keys_never_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path().join("merged"));
        tokio::fs::write(dir.path().join("secret.txt"), b"x").await.unwrap();

        for key in ["../secret.txt", "..", "sub/file.pdf", "a\\b.pdf", ""] {
            assert!(matches!(storage.get(key).await, Err(AppError::NotFound(_))), "{key}");
            assert!(!storage.exists(key).await.unwrap(), "{key}");
        }
        assert!(matches!(
            storage.put("../escape.pdf", Bytes::new()).await,
            Err(AppError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path().join("not-created"));
        assert!(storage.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());
        tokio::fs::create_dir(dir.path().join("nested")).await.unwrap();
        storage.put("b.pdf", Bytes::from_static(b"bb")).await.unwrap();
        storage.put("a.pdf", Bytes::from_static(b"a")).await.unwrap();

        let listed = storage.list().await.unwrap();
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a.pdf", "b.pdf"]);
        assert_eq!(listed[1].size_bytes, 2);
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path());
        storage.put("a.pdf", Bytes::from_static(b"a")).await.unwrap();
        storage.delete("a.pdf").await.unwrap();
        assert!(!storage.exists("a.pdf").await.unwrap());
        assert!(storage.delete("a.pdf").await.is_err());
    }
}
