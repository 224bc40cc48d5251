use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;
use crate::models::item::{ExtractedItem, ItemPatch};
use crate::models::job::{ErrorBody, JobId, StatusPayload, SubmitResponse};
use crate::models::storefront::{PublishRequest, Storefront};
use crate::services::analyzer::run_analysis;
use crate::services::job_store::StoreError;

/// Error response carrying a `{ "detail": ... }` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::JobNotFound(_) | StoreError::ItemNotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::NotEditable { .. } => StatusCode::CONFLICT,
            StoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            StoreError::Invalid(_) => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            detail: err.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: ExtractedItem,
    pub remaining_items: usize,
}

/// POST /jobs: upload a video (multipart field `file`) and start its analysis.
pub async fn submit_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            upload = Some((filename, data.to_vec()));
        }
    }

    let (filename, video) = upload.ok_or_else(|| ApiError::bad_request("Missing file field"))?;
    if video.is_empty() {
        return Err(ApiError::bad_request("Uploaded file is empty"));
    }
    if video.len() > state.max_upload_bytes {
        return Err(ApiError::bad_request(format!(
            "File size must be less than {} MB",
            state.max_upload_bytes / (1024 * 1024)
        )));
    }

    let job_id = state.store.create(&filename).await;
    metrics::counter!("jobs_submitted_total").increment(1);
    tracing::info!(job_id = %job_id, filename = %filename, bytes = video.len(), "Job created");

    tokio::spawn(run_analysis(
        state.store.clone(),
        state.analyzer.clone(),
        job_id.clone(),
        video,
    ));

    Ok(Json(SubmitResponse { job_id }))
}

/// GET /jobs/{job_id}/status
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<StatusPayload>, ApiError> {
    let status = state.store.status(&JobId::new(job_id)).await?;
    Ok(Json(status))
}

/// PUT /jobs/{job_id}/items/{index}: partial item update.
pub async fn update_item(
    State(state): State<AppState>,
    Path((job_id, index)): Path<(String, usize)>,
    Json(patch): Json<ItemPatch>,
) -> Result<Json<ExtractedItem>, ApiError> {
    let job_id = JobId::new(job_id);
    let item = state.store.update_item(&job_id, index, &patch).await?;
    metrics::counter!("items_updated_total").increment(1);
    tracing::debug!(job_id = %job_id, index, "Item updated");
    Ok(Json(item))
}

/// DELETE /jobs/{job_id}/items/{index}
pub async fn delete_item(
    State(state): State<AppState>,
    Path((job_id, index)): Path<(String, usize)>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let job_id = JobId::new(job_id);
    let (deleted, remaining_items) = state.store.delete_item(&job_id, index).await?;
    metrics::counter!("items_deleted_total").increment(1);
    tracing::debug!(job_id = %job_id, index, remaining_items, "Item deleted");
    Ok(Json(DeleteResponse {
        deleted,
        remaining_items,
    }))
}

/// POST /jobs/{job_id}/publish: create the storefront from the job's items.
pub async fn publish(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(request): Json<PublishRequest>,
) -> Result<Json<Storefront>, ApiError> {
    let job_id = JobId::new(job_id);
    let storefront = state.store.publish(&job_id, &request.credentials).await?;
    metrics::counter!("storefronts_published_total").increment(1);
    tracing::info!(
        job_id = %job_id,
        posted = storefront.posted_count,
        failed = storefront.failed_count,
        "Storefront published"
    );
    Ok(Json(storefront))
}
