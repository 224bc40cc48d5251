use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use crate::app_state::AppState;

pub mod health;
pub mod jobs;
pub mod metrics;

/// Job contract and health routes of the reference backend.
pub fn api_router(state: AppState) -> Router {
    // Leaves room for multipart framing above the upload limit
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes + 64 * 1024);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/jobs", post(jobs::submit_job))
        .route("/jobs/{job_id}/status", get(jobs::get_job_status))
        .route(
            "/jobs/{job_id}/items/{index}",
            put(jobs::update_item).delete(jobs::delete_item),
        )
        .route("/jobs/{job_id}/publish", post(jobs::publish))
        .layer(body_limit)
        .with_state(state)
}
