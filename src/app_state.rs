use std::sync::Arc;

use crate::services::{analyzer::Analyzer, job_store::JobStore};

/// Shared reference backend state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub analyzer: Arc<dyn Analyzer>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(store: JobStore, analyzer: impl Analyzer + 'static, max_upload_bytes: usize) -> Self {
        Self {
            store: Arc::new(store),
            analyzer: Arc::new(analyzer),
            max_upload_bytes,
        }
    }
}
