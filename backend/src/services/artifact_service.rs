//! Artifact store: names, writes and reads merged artifacts.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{Local, NaiveDate};

use crate::error::{AppError, Result};
use crate::storage::{StorageBackend, StoredObject};

/// Deterministic artifact name for a team on a calendar date.
///
/// Merges for the same team on the same day share this name, so the later
/// write replaces the earlier artifact.
pub fn artifact_filename(team_id: &str, date: NaiveDate) -> String {
    format!("User {} - Evidence {}.pdf", team_id, date.format("%Y-%m-%d"))
}

/// Where a merged artifact was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedArtifact {
    pub path: String,
    pub filename: String,
}

/// Merged artifact persistence on top of a storage backend.
#[derive(Clone)]
pub struct ArtifactStore {
    storage: Arc<dyn StorageBackend>,
}

impl ArtifactStore {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Save under today's name in server-local time.
    pub async fn save(&self, team_id: &str, content: Vec<u8>) -> Result<SavedArtifact> {
        self.save_on(team_id, Local::now().date_naive(), content)
            .await
    }

    /// Save under the name for `date`, overwriting any artifact already there.
    pub async fn save_on(
        &self,
        team_id: &str,
        date: NaiveDate,
        content: Vec<u8>,
    ) -> Result<SavedArtifact> {
        let filename = artifact_filename(team_id, date);
        let size = content.len();
        self.storage
            .put(&filename, Bytes::from(content))
            .await
            .map_err(|e| match e {
                AppError::Storage(_) => e,
                other => AppError::Storage(other.to_string()),
            })?;

        tracing::info!(filename = %filename, size_bytes = size, "Saved merged artifact");

        Ok(SavedArtifact {
            path: self.storage.location(&filename),
            filename,
        })
    }

    /// Bytes of a stored artifact; `AppError::NotFound` when absent.
    pub async fn retrieve(&self, filename: &str) -> Result<Bytes> {
        self.storage.get(filename).await
    }

    pub async fn enumerate(&self) -> Result<Vec<StoredObject>> {
        self.storage.list().await
    }

    pub async fn delete(&self, filename: &str) -> Result<()> {
        self.storage.delete(filename).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::filesystem::FilesystemStorage;

    fn store(dir: &tempfile::TempDir) -> ArtifactStore {
        ArtifactStore::new(Arc::new(FilesystemStorage::new(dir.path())))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_filename_format() {
        assert_eq!(
            artifact_filename("42", date(2024, 3, 7)),
            "User 42 - Evidence 2024-03-07.pdf"
        );
    }

    #[tokio::test]
    async fn test_save_then_retrieve() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let saved = store
            .save_on("42", date(2024, 3, 7), b"%PDF-merged".to_vec())
            .await
            .unwrap();

        assert_eq!(saved.filename, "User 42 - Evidence 2024-03-07.pdf");
        assert!(saved.path.ends_with("User 42 - Evidence 2024-03-07.pdf"));
        let bytes = store.retrieve(&saved.filename).await.unwrap();
        assert_eq!(&bytes[..], b"%PDF-merged");
    }

    #[tokio::test]
    async fn test_same_day_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let day = date(2024, 3, 7);

        store.save_on("42", day, b"first".to_vec()).await.unwrap();
        let saved = store.save_on("42", day, b"second".to_vec()).await.unwrap();

        assert_eq!(&store.retrieve(&saved.filename).await.unwrap()[..], b"second");
        assert_eq!(store.enumerate().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_different_days_and_teams_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        store.save_on("42", date(2024, 3, 7), b"a".to_vec()).await.unwrap();
        store.save_on("42", date(2024, 3, 8), b"b".to_vec()).await.unwrap();
        store.save_on("7", date(2024, 3, 7), b"c".to_vec()).await.unwrap();

        let keys: Vec<String> = store
            .enumerate()
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();
        assert_eq!(
            keys,
            vec![
                "User 42 - Evidence 2024-03-07.pdf",
                "User 42 - Evidence 2024-03-08.pdf",
                "User 7 - Evidence 2024-03-07.pdf",
            ]
        );
    }

    #[tokio::test]
    async fn test_retrieve_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(&dir).retrieve("nope.pdf").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
