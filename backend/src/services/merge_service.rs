//! Merge orchestration: normalize, assemble, store, then record.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, Result};
use crate::models::merged_file::{LedgerPage, NewMergedFile};
use crate::models::upload::{NormalizedDocument, UploadedFile};
use crate::services::artifact_service::ArtifactStore;
use crate::services::assembly_service::assemble;
use crate::services::conversion_service::normalize_batch;
use crate::services::ledger_service::Ledger;

/// Ledger rows per listing page.
pub const PAGE_SIZE: u32 = 25;

/// One merge submission.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub team_id: String,
    pub ticket_id: String,
    pub creator_ip: String,
    pub files: Vec<UploadedFile>,
}

/// An upload that was left out of the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SkippedFile {
    pub filename: String,
    pub reason: String,
}

/// Result of a successful merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub filename: String,
    pub path: String,
    pub page_count: usize,
    pub skipped: Vec<SkippedFile>,
}

/// The identifier as given, or `Validation` unless it is non-empty ASCII
/// digits. Surrounding whitespace is rejected, not stripped.
pub fn validate_identifier(field: &str, value: &str) -> Result<String> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::Validation(format!(
            "{} must be a number",
            field.replace('_', " ")
        )));
    }
    Ok(value.to_string())
}

/// Keep the converted documents and report the rest.
///
/// Fails with `NoValidFiles` when nothing converted, including for an empty
/// batch.
pub fn select_batch(
    outcomes: Vec<(String, Result<NormalizedDocument>)>,
) -> Result<(Vec<NormalizedDocument>, Vec<SkippedFile>)> {
    let mut documents = Vec::new();
    let mut skipped = Vec::new();

    for (filename, outcome) in outcomes {
        match outcome {
            Ok(doc) => documents.push(doc),
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "Skipping upload");
                skipped.push(SkippedFile {
                    filename,
                    reason: e.public_message(),
                });
            }
        }
    }

    if documents.is_empty() {
        return Err(AppError::NoValidFiles);
    }
    Ok((documents, skipped))
}

/// Merge pipeline plus the ledger queries behind it.
#[derive(Clone)]
pub struct MergeService {
    store: ArtifactStore,
    ledger: Arc<dyn Ledger>,
}

impl MergeService {
    pub fn new(store: ArtifactStore, ledger: Arc<dyn Ledger>) -> Self {
        Self { store, ledger }
    }

    pub async fn merge(&self, request: MergeRequest) -> Result<MergeOutcome> {
        self.merge_on(request, Local::now().date_naive()).await
    }

    /// Merge the uploads in order and save under the name for `date`.
    ///
    /// Identifiers are checked before any file is read. Nothing is stored
    /// or recorded unless assembly succeeds, and no ledger row is written
    /// unless the store accepted the artifact.
    pub async fn merge_on(&self, request: MergeRequest, date: NaiveDate) -> Result<MergeOutcome> {
        let team_id = validate_identifier("team_id", &request.team_id)?;
        let ticket_id = validate_identifier("ticket_id", &request.ticket_id)?;

        if request.files.is_empty() {
            return Err(AppError::NoValidFiles);
        }

        let files = request.files;
        let (assembled, skipped) = tokio::task::spawn_blocking(move || {
            let (documents, skipped) = select_batch(normalize_batch(&files))?;
            assemble(&documents).map(|doc| (doc, skipped))
        })
        .await
        .map_err(|e| AppError::Internal(format!("Merge task failed: {}", e)))??;

        let saved = self.store.save_on(&team_id, date, assembled.bytes).await?;

        let entry = NewMergedFile {
            creator_ip: request.creator_ip,
            timestamp: Utc::now(),
            filename: saved.filename.clone(),
            team_id: team_id.clone(),
            salesforce_ticket: ticket_id.clone(),
        };
        if let Err(e) = self.ledger.record_creation(entry).await {
            tracing::warn!(
                filename = %saved.filename,
                error = %e,
                "Merged artifact saved but ledger row was not written"
            );
        }

        tracing::info!(
            filename = %saved.filename,
            team_id = %team_id,
            ticket_id = %ticket_id,
            pages = assembled.page_count,
            skipped = skipped.len(),
            "Merge completed"
        );

        Ok(MergeOutcome {
            filename: saved.filename,
            path: saved.path,
            page_count: assembled.page_count,
            skipped,
        })
    }

    /// Artifact bytes, counting the download against the newest ledger row
    /// of that name. A missing artifact leaves the ledger untouched.
    pub async fn download(&self, filename: &str, downloader_ip: &str) -> Result<Bytes> {
        let bytes = self.store.retrieve(filename).await?;

        match self.ledger.record_download(filename, downloader_ip).await? {
            Some(row) => tracing::info!(
                filename = %filename,
                merged_file_id = row.id,
                download_count = row.download_count,
                "Download recorded"
            ),
            None => tracing::debug!(filename = %filename, "Downloaded artifact has no ledger row"),
        }

        Ok(bytes)
    }

    /// One page of the ledger; `page` is 1-based.
    pub async fn list(&self, page: u32) -> Result<LedgerPage> {
        self.ledger.list_page(page.max(1), PAGE_SIZE).await
    }
}
