//! Merge ledger: who merged what, and who downloaded it.
//!
//! `merged_files` holds one row per successful merge; `download_logs` holds
//! one row per successful retrieval. A filename can map to several rows
//! when the same team merged more than once on one day; downloads are
//! attributed to the most recent of them.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::merged_file::{
    DownloadLog, LedgerPage, MergedFile, MergedFileWithDownloads, NewMergedFile,
};

/// Persistence for merge and download records.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Insert a `merged_files` row with `download_count = 0`.
    async fn record_creation(&self, entry: NewMergedFile) -> Result<MergedFile>;

    /// Increment the download count of the newest row named `filename` and
    /// log the download. `None` when no row carries that name.
    async fn record_download(
        &self,
        filename: &str,
        downloader_ip: &str,
    ) -> Result<Option<MergedFile>>;

    /// One page of rows, newest first, each with its downloads newest first.
    /// `page` is 1-based.
    async fn list_page(&self, page: u32, per_page: u32) -> Result<LedgerPage>;
}

/// Rows to skip before `page`.
pub fn page_offset(page: u32, per_page: u32) -> i64 {
    i64::from(page.max(1) - 1) * i64::from(per_page)
}

/// Attach each file's downloads, newest first, preserving the file order.
pub fn group_downloads(
    files: Vec<MergedFile>,
    logs: Vec<DownloadLog>,
) -> Vec<MergedFileWithDownloads> {
    let mut by_file: HashMap<i64, Vec<DownloadLog>> = HashMap::new();
    for log in logs {
        by_file.entry(log.merged_file_id).or_default().push(log);
    }

    files
        .into_iter()
        .map(|file| {
            let mut downloads = by_file.remove(&file.id).unwrap_or_default();
            downloads.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
            MergedFileWithDownloads { file, downloads }
        })
        .collect()
}

/// Postgres-backed ledger.
pub struct PgLedger {
    db: PgPool,
}

impl PgLedger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn record_creation(&self, entry: NewMergedFile) -> Result<MergedFile> {
        let row = sqlx::query_as::<_, MergedFile>(
            r#"
            INSERT INTO merged_files (creator_ip, timestamp, filename, team_id, salesforce_ticket, download_count)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING id, creator_ip, timestamp, filename, team_id, salesforce_ticket, download_count
            "#,
        )
        .bind(&entry.creator_ip)
        .bind(entry.timestamp)
        .bind(&entry.filename)
        .bind(&entry.team_id)
        .bind(&entry.salesforce_ticket)
        .fetch_one(&self.db)
        .await?;

        Ok(row)
    }

    async fn record_download(
        &self,
        filename: &str,
        downloader_ip: &str,
    ) -> Result<Option<MergedFile>> {
        let mut tx = self.db.begin().await?;

        let target: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM merged_files
            WHERE filename = $1
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(filename)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(id) = target else {
            return Ok(None);
        };

        let updated = sqlx::query_as::<_, MergedFile>(
            r#"
            UPDATE merged_files
            SET download_count = download_count + 1
            WHERE id = $1
            RETURNING id, creator_ip, timestamp, filename, team_id, salesforce_ticket, download_count
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO download_logs (merged_file_id, downloader_ip, timestamp) VALUES ($1, $2, NOW())",
        )
        .bind(id)
        .bind(downloader_ip)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn list_page(&self, page: u32, per_page: u32) -> Result<LedgerPage> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM merged_files")
            .fetch_one(&self.db)
            .await?;

        let files = sqlx::query_as::<_, MergedFile>(
            r#"
            SELECT id, creator_ip, timestamp, filename, team_id, salesforce_ticket, download_count
            FROM merged_files
            ORDER BY timestamp DESC, id DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(per_page))
        .bind(page_offset(page, per_page))
        .fetch_all(&self.db)
        .await?;

        let ids: Vec<i64> = files.iter().map(|f| f.id).collect();
        let logs = if ids.is_empty() {
            Vec::new()
        } else {
            sqlx::query_as::<_, DownloadLog>(
                r#"
                SELECT id, merged_file_id, downloader_ip, timestamp
                FROM download_logs
                WHERE merged_file_id = ANY($1)
                ORDER BY timestamp DESC, id DESC
                "#,
            )
            .bind(&ids)
            .fetch_all(&self.db)
            .await?
        };

        Ok(LedgerPage {
            items: group_downloads(files, logs),
            total,
        })
    }
}
