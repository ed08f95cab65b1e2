//! Merge, ledger listing and download handlers.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::client_ip::ClientIp;
use crate::api::download_response::DownloadResponse;
use crate::api::dto::{PageQuery, Pagination};
use crate::api::SharedState;
use crate::error::{AppError, Result};
use crate::models::merged_file::{DownloadLog, MergedFile, MergedFileWithDownloads};
use crate::models::upload::UploadedFile;
use crate::services::merge_service::{MergeRequest, SkippedFile, PAGE_SIZE};

#[derive(OpenApi)]
#[openapi(
    paths(create_merge, list_merges, download_merge),
    components(schemas(
        MergeUploadForm,
        MergeResponse,
        SkippedFile,
        MergeListResponse,
        MergedFileWithDownloads,
        MergedFile,
        DownloadLog,
        Pagination,
    ))
)]
pub struct MergesApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(create_merge).get(list_merges))
        .route("/download/:filename", get(download_merge))
}

/// Multipart form accepted by the merge endpoint.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct MergeUploadForm {
    /// File to merge. Repeat the field once per file, in merge order.
    #[schema(value_type = String, format = Binary)]
    pub files: Vec<u8>,
    /// Numeric team identifier
    pub team_id: String,
    /// Numeric ticket identifier
    pub ticket_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MergeResponse {
    pub filename: String,
    pub download_url: String,
    pub page_count: usize,
    pub skipped_files: Vec<SkippedFile>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MergeListResponse {
    pub items: Vec<MergedFileWithDownloads>,
    pub pagination: Pagination,
}

/// Relative URL serving `filename`, with the name percent-encoded.
pub fn download_url(filename: &str) -> String {
    format!(
        "/api/v1/merges/download/{}",
        urlencoding::encode(filename)
    )
}

/// Collect the ordered uploads and identifiers from the multipart body.
async fn read_merge_form(mut multipart: Multipart) -> Result<(Vec<UploadedFile>, String, String)> {
    let mut files = Vec::new();
    let mut team_id = String::new();
    let mut ticket_id = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "files" | "files[]" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {}", e)))?;
                files.push(UploadedFile::new(filename, data));
            }
            "team_id" | "ticket_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.to_string()))?;
                if name == "team_id" {
                    team_id = value;
                } else {
                    ticket_id = value;
                }
            }
            _ => {}
        }
    }

    Ok((files, team_id, ticket_id))
}

/// Merge uploaded files into one PDF
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/v1/merges",
    tag = "merges",
    request_body(content = MergeUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Merged artifact saved", body = MergeResponse),
        (status = 400, description = "Invalid identifiers or no valid files", body = crate::api::openapi::ErrorResponse),
        (status = 422, description = "An upload could not be merged as PDF", body = crate::api::openapi::ErrorResponse),
        (status = 500, description = "Storage failure", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_merge(
    State(state): State<SharedState>,
    ClientIp(creator_ip): ClientIp,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MergeResponse>)> {
    let (files, team_id, ticket_id) = read_merge_form(multipart).await?;

    let outcome = state
        .merge_service
        .merge(MergeRequest {
            team_id,
            ticket_id,
            creator_ip,
            files,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(MergeResponse {
            download_url: download_url(&outcome.filename),
            filename: outcome.filename,
            page_count: outcome.page_count,
            skipped_files: outcome.skipped,
        }),
    ))
}

/// List merged artifacts, newest first
#[utoipa::path(
    get,
    path = "",
    context_path = "/api/v1/merges",
    tag = "merges",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of the merge ledger", body = MergeListResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_merges(
    State(state): State<SharedState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<MergeListResponse>> {
    let page = query.page();
    let ledger_page = state.merge_service.list(page).await?;

    Ok(Json(MergeListResponse {
        items: ledger_page.items,
        pagination: Pagination::new(page, PAGE_SIZE, ledger_page.total),
    }))
}

/// Download a merged artifact
#[utoipa::path(
    get,
    path = "/download/{filename}",
    context_path = "/api/v1/merges",
    tag = "merges",
    params(("filename" = String, Path, description = "Artifact filename")),
    responses(
        (status = 200, description = "PDF attachment", content_type = "application/pdf"),
        (status = 404, description = "No artifact with that name", body = crate::api::openapi::ErrorResponse),
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_merge(
    State(state): State<SharedState>,
    ClientIp(downloader_ip): ClientIp,
    Path(filename): Path<String>,
) -> Result<DownloadResponse> {
    let data = state
        .merge_service
        .download(&filename, &downloader_ip)
        .await?;
    Ok(DownloadResponse::pdf(data, filename))
}
