//! Retention sweep for merged artifacts.
//!
//! Deletes stored artifacts whose modification time is older than the
//! threshold. Ledger rows and their download logs are left in place.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::Result;
use crate::services::artifact_service::ArtifactStore;

/// Thirty days.
pub const DEFAULT_RETENTION_SECS: u64 = 2_592_000;

/// Result of a retention sweep.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SweepResult {
    pub status: String,
    pub scanned: usize,
    pub deleted: Vec<String>,
    pub errors: Vec<String>,
}

/// Oldest modification time that survives a sweep at `now`.
pub(crate) fn cutoff(now: DateTime<Utc>, threshold_secs: u64) -> DateTime<Utc> {
    i64::try_from(threshold_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub struct RetentionService {
    store: ArtifactStore,
}

impl RetentionService {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    pub async fn sweep(&self, threshold_secs: u64) -> Result<SweepResult> {
        self.sweep_at(Utc::now(), threshold_secs).await
    }

    /// Delete every artifact last modified before `now - threshold_secs`.
    ///
    /// A failure to delete one artifact is recorded in `errors` and the
    /// sweep moves on; only a failure to enumerate the store is returned.
    pub async fn sweep_at(&self, now: DateTime<Utc>, threshold_secs: u64) -> Result<SweepResult> {
        let cutoff = cutoff(now, threshold_secs);
        let objects = self.store.enumerate().await?;

        let mut result = SweepResult {
            status: "Cleanup completed".to_string(),
            scanned: objects.len(),
            deleted: Vec::new(),
            errors: Vec::new(),
        };

        for object in objects.into_iter().filter(|o| o.modified_at < cutoff) {
            match self.store.delete(&object.key).await {
                Ok(()) => {
                    tracing::debug!(filename = %object.key, modified_at = %object.modified_at, "Expired artifact removed");
                    result.deleted.push(object.key);
                }
                Err(e) => {
                    let msg = format!("Failed to delete {}: {}", object.key, e);
                    tracing::warn!("{}", msg);
                    result.errors.push(msg);
                }
            }
        }

        tracing::info!(
            scanned = result.scanned,
            deleted = result.deleted.len(),
            errors = result.errors.len(),
            "Retention sweep finished"
        );

        Ok(result)
    }
}
