use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use garde::Validate;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::models::item::{ExtractedItem, ItemPatch};
use crate::models::job::{JobId, StatusPayload};
use crate::models::storefront::{rental_price, Credentials, FailedListing, PostedListing, Storefront};

/// Marketplace name reported on published storefronts.
const PLATFORM: &str = "UseThis";

/// Rental days used to project income from a daily rental price.
const RENTAL_DAYS: f64 = 30.0;

/// Upper bound on the delay between two eviction sweeps.
const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum RecordStatus {
    Processing,
    Completed,
    Failed,
    Published,
}

/// Backend-side view of one analysis job.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub filename: String,
    pub status: RecordStatus,
    pub progress: u8,
    pub items: Vec<ExtractedItem>,
    pub error: Option<String>,
    pub storefront: Option<Storefront>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// In-memory job table of the reference backend.
#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, JobRecord>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new job in `processing` state.
    pub async fn create(&self, filename: &str) -> JobId {
        let id = JobId::new(Uuid::new_v4().to_string());
        let now = Utc::now();
        let record = JobRecord {
            id: id.clone(),
            filename: filename.to_string(),
            status: RecordStatus::Processing,
            progress: 0,
            items: Vec::new(),
            error: None,
            storefront: None,
            created_at: now,
            updated_at: now,
        };
        self.jobs.write().await.insert(id.clone(), record);
        id
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.jobs.read().await.get(id).cloned()
    }

    /// Record analysis progress. Never moves progress backwards.
    pub async fn set_progress(&self, id: &JobId, progress: u8) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(id) {
            if job.status == RecordStatus::Processing && progress > job.progress {
                job.progress = progress.min(100);
                job.updated_at = Utc::now();
            }
        }
    }

    pub async fn complete(&self, id: &JobId, items: Vec<ExtractedItem>) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(id) {
            job.status = RecordStatus::Completed;
            job.progress = 100;
            job.items = items;
            job.updated_at = Utc::now();
        }
    }

    pub async fn fail(&self, id: &JobId, error: String) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(id) {
            job.status = RecordStatus::Failed;
            job.error = Some(error);
            job.updated_at = Utc::now();
        }
    }

    pub async fn status(&self, id: &JobId) -> Result<StatusPayload, StoreError> {
        let jobs = self.jobs.read().await;
        let job = jobs.get(id).ok_or_else(|| StoreError::JobNotFound(id.clone()))?;
        Ok(match job.status {
            RecordStatus::Processing => StatusPayload::Processing {
                progress: job.progress,
            },
            RecordStatus::Completed | RecordStatus::Published => StatusPayload::Completed {
                progress: job.progress,
                items: job.items.clone(),
            },
            RecordStatus::Failed => StatusPayload::Failed {
                progress: job.progress,
                error: job.error.clone().unwrap_or_else(|| "Extraction failed".to_string()),
            },
        })
    }

    pub async fn update_item(
        &self,
        id: &JobId,
        index: usize,
        patch: &ItemPatch,
    ) -> Result<ExtractedItem, StoreError> {
        patch
            .validate()
            .map_err(|report| StoreError::Invalid(report.to_string()))?;

        let mut jobs = self.jobs.write().await;
        let job = editable(&mut jobs, id)?;
        let len = job.items.len();
        let item = job
            .items
            .get_mut(index)
            .ok_or(StoreError::ItemNotFound { index, len })?;
        item.apply(patch);
        let updated = item.clone();
        job.updated_at = Utc::now();
        Ok(updated)
    }

    /// Remove the item at `index`. Returns it with the number of items left.
    pub async fn delete_item(
        &self,
        id: &JobId,
        index: usize,
    ) -> Result<(ExtractedItem, usize), StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = editable(&mut jobs, id)?;
        let len = job.items.len();
        if index >= len {
            return Err(StoreError::ItemNotFound { index, len });
        }
        let removed = job.items.remove(index);
        job.updated_at = Utc::now();
        Ok((removed, job.items.len()))
    }

    /// Turn the job's items into storefront listings. Allowed once per job.
    pub async fn publish(
        &self,
        id: &JobId,
        credentials: &Credentials,
    ) -> Result<Storefront, StoreError> {
        if credentials.email.trim().is_empty() {
            return Err(StoreError::Unauthorized(
                "Storefront email is required".to_string(),
            ));
        }

        let mut jobs = self.jobs.write().await;
        let job = editable(&mut jobs, id)?;

        let mut listings = Vec::new();
        let mut failed_listings = Vec::new();
        for item in &job.items {
            match item.validate() {
                Ok(()) => listings.push(PostedListing {
                    title: item.name.clone(),
                    original_price: item.estimated_price,
                    rental_price: rental_price(item.estimated_price),
                    category: item.category.clone(),
                    condition: item.condition.clone(),
                    status: "live".to_string(),
                }),
                Err(report) => failed_listings.push(FailedListing {
                    item_name: item.name.clone(),
                    error: report.to_string(),
                }),
            }
        }

        let total_potential_income = listings
            .iter()
            .map(|listing| listing.rental_price * RENTAL_DAYS)
            .sum();
        let storefront = Storefront {
            platform: PLATFORM.to_string(),
            posted_count: listings.len(),
            failed_count: failed_listings.len(),
            total_potential_income,
            message: Some(format!(
                "Posted {} items to {PLATFORM} rental marketplace",
                listings.len()
            )),
            listings,
            failed_listings,
            published_at: Utc::now(),
        };

        job.status = RecordStatus::Published;
        job.storefront = Some(storefront.clone());
        job.updated_at = Utc::now();
        Ok(storefront)
    }
}

impl JobStore {
    /// Drop failed and published jobs untouched for at least `retention`.
    /// Returns how many were removed.
    pub async fn evict_finished(&self, retention: Duration) -> usize {
        let now = Utc::now();
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            let finished = matches!(job.status, RecordStatus::Failed | RecordStatus::Published);
            let expired = (now - job.updated_at)
                .to_std()
                .is_ok_and(|age| age >= retention);
            !(finished && expired)
        });
        before - jobs.len()
    }

    /// Periodically evict finished jobs in the background.
    pub fn spawn_sweeper(self: &Arc<Self>, retention: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let period = retention.clamp(Duration::from_millis(1), MAX_SWEEP_PERIOD);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = store.evict_finished(retention).await;
                if evicted > 0 {
                    let remaining = store.len().await;
                    tracing::info!(evicted, remaining, "Evicted finished jobs");
                }
            }
        })
    }
}

/// Look up a job whose items may still change.
fn editable<'a>(
    jobs: &'a mut HashMap<JobId, JobRecord>,
    id: &JobId,
) -> Result<&'a mut JobRecord, StoreError> {
    let job = jobs
        .get_mut(id)
        .ok_or_else(|| StoreError::JobNotFound(id.clone()))?;
    if job.status != RecordStatus::Completed {
        return Err(StoreError::NotEditable {
            id: id.clone(),
            status: job.status,
        });
    }
    Ok(job)
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Job {0} not found")]
    JobNotFound(JobId),

    #[error("Item index {index} out of range ({len} items)")]
    ItemNotFound { index: usize, len: usize },

    #[error("Job {id} is {status} and cannot be changed")]
    NotEditable { id: JobId, status: RecordStatus },

    #[error("{0}")]
    Unauthorized(String),

    #[error("Invalid item: {0}")]
    Invalid(String),
}
