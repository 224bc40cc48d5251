use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use garde::Validate;

use crate::models::item::ExtractedItem;
use crate::models::job::JobId;
use crate::services::job_store::JobStore;

/// Progress stages reported while an analysis runs.
const PROGRESS_STAGES: [u8; 4] = [10, 30, 60, 80];

/// Writes analysis progress back to the job record.
pub struct ProgressReporter {
    store: Arc<JobStore>,
    job_id: JobId,
}

impl ProgressReporter {
    pub fn new(store: Arc<JobStore>, job_id: JobId) -> Self {
        Self { store, job_id }
    }

    pub async fn report(&self, progress: u8) {
        self.store.set_progress(&self.job_id, progress).await;
    }
}

/// Turns an uploaded video into extracted items.
pub trait Analyzer: Send + Sync {
    fn analyze<'a>(
        &'a self,
        video: &'a [u8],
        progress: &'a ProgressReporter,
    ) -> BoxFuture<'a, Result<Vec<ExtractedItem>, AnalyzeError>>;
}

/// Analyzer returning a fixed item list after walking through the progress stages.
pub struct FixtureAnalyzer {
    items: Vec<ExtractedItem>,
    step: Duration,
}

impl FixtureAnalyzer {
    pub fn new(items: Vec<ExtractedItem>, step: Duration) -> Self {
        Self { items, step }
    }

    /// Load the item list from a JSON array on disk.
    pub fn from_path(path: &Path, step: Duration) -> Result<Self, AnalyzeError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AnalyzeError::Fixture(format!("{}: {e}", path.display())))?;
        let items: Vec<ExtractedItem> = serde_json::from_str(&raw)
            .map_err(|e| AnalyzeError::Fixture(format!("{}: {e}", path.display())))?;
        for (index, item) in items.iter().enumerate() {
            item.validate()
                .map_err(|report| AnalyzeError::Fixture(format!("item {index}: {report}")))?;
        }
        Ok(Self::new(items, step))
    }
}

impl Analyzer for FixtureAnalyzer {
    fn analyze<'a>(
        &'a self,
        video: &'a [u8],
        progress: &'a ProgressReporter,
    ) -> BoxFuture<'a, Result<Vec<ExtractedItem>, AnalyzeError>> {
        Box::pin(async move {
            if video.is_empty() {
                return Err(AnalyzeError::EmptyInput);
            }
            for stage in PROGRESS_STAGES {
                progress.report(stage).await;
                tokio::time::sleep(self.step).await;
            }
            Ok(self.items.clone())
        })
    }
}

/// Run `analyzer` on `video` and store the outcome on the job record.
pub async fn run_analysis(
    store: Arc<JobStore>,
    analyzer: Arc<dyn Analyzer>,
    job_id: JobId,
    video: Vec<u8>,
) {
    let reporter = ProgressReporter::new(Arc::clone(&store), job_id.clone());
    let start = std::time::Instant::now();

    match analyzer.analyze(&video, &reporter).await {
        Ok(items) => {
            tracing::info!(
                job_id = %job_id,
                items = items.len(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Analysis completed"
            );
            metrics::counter!("jobs_completed_total").increment(1);
            store.complete(&job_id, items).await;
        }
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Analysis failed");
            metrics::counter!("jobs_failed_total").increment(1);
            store.fail(&job_id, e.to_string()).await;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("Uploaded video is empty")]
    EmptyInput,

    #[error("Invalid fixture items: {0}")]
    Fixture(String),

    /// Raised by analyzers that could not extract anything from the video.
    #[error("Analysis failed: {0}")]
    Failed(String),
}
