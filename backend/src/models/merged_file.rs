//! Merged artifact ledger models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// One merged artifact as recorded in `merged_files`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, ToSchema)]
pub struct MergedFile {
    pub id: i64,
    pub creator_ip: String,
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub team_id: String,
    pub salesforce_ticket: String,
    pub download_count: i64,
}

/// One retrieval of a merged artifact, as recorded in `download_logs`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, ToSchema)]
pub struct DownloadLog {
    pub id: i64,
    pub merged_file_id: i64,
    pub downloader_ip: String,
    pub timestamp: DateTime<Utc>,
}

/// Values for a new `merged_files` row.
#[derive(Debug, Clone)]
pub struct NewMergedFile {
    pub creator_ip: String,
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub team_id: String,
    pub salesforce_ticket: String,
}

/// A ledger row together with its downloads, newest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MergedFileWithDownloads {
    #[serde(flatten)]
    pub file: MergedFile,
    pub downloads: Vec<DownloadLog>,
}

/// One page of ledger rows plus the total row count.
#[derive(Debug, Clone)]
pub struct LedgerPage {
    pub items: Vec<MergedFileWithDownloads>,
    pub total: i64,
}
