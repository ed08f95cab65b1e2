//! Retention sweep trigger.
//!
//! Called by an external scheduler, so no token is required.

use axum::{extract::State, routing::post, Json, Router};
use utoipa::OpenApi;

use crate::api::SharedState;
use crate::error::Result;
use crate::services::retention_service::SweepResult;

#[derive(OpenApi)]
#[openapi(paths(run_cleanup), components(schemas(SweepResult)))]
pub struct CleanupApiDoc;

pub fn router() -> Router<SharedState> {
    Router::new().route("/", post(run_cleanup))
}

/// POST /api/v1/cleanup
#[utoipa::path(
    post,
    path = "",
    context_path = "/api/v1/cleanup",
    tag = "retention",
    operation_id = "run_cleanup",
    responses(
        (status = 200, description = "Sweep finished", body = SweepResult),
    )
)]
pub async fn run_cleanup(State(state): State<SharedState>) -> Result<Json<SweepResult>> {
    let result = state
        .retention_service
        .sweep(state.config.retention_threshold_secs())
        .await?;
    Ok(Json(result))
}
