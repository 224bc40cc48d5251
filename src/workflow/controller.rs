//! Job lifecycle controller.
//!
//! Owns the job's state and the poll scheduler, and is the only place that
//! decides whether a failure ends the job or leaves it editable.

use std::sync::Arc;

use garde::Validate;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::models::item::{FieldValue, ItemField, ItemPatch};
use crate::models::job::{JobId, JobStatus};
use crate::models::storefront::{Credentials, Storefront};
use crate::services::job_client::{Asset, ClientError, JobClient};
use crate::services::poller::{PollEvent, PollEventKind, PollScheduler, PollSettings};
use crate::workflow::error::WorkflowError;
use crate::workflow::result_set::ResultSet;
use crate::workflow::state::JobState;

pub struct JobController<C: JobClient> {
    client: Arc<C>,
    scheduler: PollScheduler<C>,
    state: JobState,
    last_seq: u64,
    observer: Option<UnboundedSender<JobState>>,
}

impl<C: JobClient> JobController<C> {
    pub fn new(client: Arc<C>, settings: PollSettings) -> Self {
        let scheduler = PollScheduler::new(Arc::clone(&client), settings);
        Self {
            client,
            scheduler,
            state: JobState::Idle,
            last_seq: 0,
            observer: None,
        }
    }

    /// Receive a copy of every state the controller enters from now on.
    pub fn observe(&mut self) -> UnboundedReceiver<JobState> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observer = Some(tx);
        rx
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.state.job_id()
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler.is_active()
    }

    pub fn poll_settings(&self) -> PollSettings {
        self.scheduler.settings()
    }

    /// Upload `asset` and start polling the job it creates.
    pub async fn submit(&mut self, asset: Asset) -> Result<JobId, WorkflowError> {
        match self.state.status() {
            JobStatus::Idle => {}
            JobStatus::Uploading | JobStatus::Processing => {
                return Err(WorkflowError::AlreadyPolling)
            }
            state => {
                return Err(WorkflowError::InvalidTransition {
                    operation: "submit",
                    state,
                })
            }
        }
        // Nothing is uploaded when polling could not run afterwards
        self.scheduler.settings().check()?;

        tracing::info!(
            filename = %asset.filename,
            bytes = asset.bytes.len(),
            "Uploading asset"
        );
        self.enter(JobState::Uploading);

        let job_id = match self.client.submit(asset).await {
            Ok(job_id) => job_id,
            Err(err) => {
                tracing::error!(error = %err, "Upload failed");
                metrics::counter!("jobs_failed_total").increment(1);
                let next = match &err {
                    ClientError::Timeout(_) => JobState::TimedOut {
                        job_id: None,
                        error: format!("Upload timed out: {err}"),
                    },
                    _ => JobState::Failed {
                        job_id: None,
                        error: format!("Failed to upload video: {err}"),
                    },
                };
                self.enter(next);
                return Err(err.into());
            }
        };

        if let Err(err) = self.scheduler.start(job_id.clone()) {
            self.enter(JobState::Failed {
                job_id: Some(job_id),
                error: err.to_string(),
            });
            return Err(err.into());
        }
        self.last_seq = 0;

        metrics::counter!("jobs_submitted_total").increment(1);
        tracing::info!(job_id = %job_id, "Job submitted, polling for progress");
        self.enter(JobState::Processing {
            job_id: job_id.clone(),
            progress: 0,
        });
        Ok(job_id)
    }

    /// Wait for one poll event and apply it.
    ///
    /// Returns `false` when no poll loop is running. Cancel-safe, so it can sit
    /// in a `select!` next to user input.
    pub async fn next_event(&mut self) -> bool {
        match self.scheduler.next_event().await {
            Some(event) => {
                self.apply_poll_event(event);
                true
            }
            None => {
                if let JobState::Processing { job_id, .. } = &self.state {
                    let job_id = job_id.clone();
                    tracing::error!(job_id = %job_id, "Poll loop ended without a terminal status");
                    self.enter(JobState::Failed {
                        job_id: Some(job_id),
                        error: "Status polling stopped unexpectedly".to_string(),
                    });
                    return true;
                }
                false
            }
        }
    }

    /// Drive polling until the job leaves `Processing`.
    pub async fn wait_settled(&mut self) -> &JobState {
        while matches!(self.state, JobState::Processing { .. }) {
            if !self.next_event().await {
                break;
            }
        }
        &self.state
    }

    /// Apply one poll event. Returns whether it changed anything.
    ///
    /// Events from an earlier loop, events not newer than the last applied one
    /// and events arriving outside `Processing` are ignored.
    pub fn apply_poll_event(&mut self, event: PollEvent) -> bool {
        if event.generation != self.scheduler.generation() || event.seq <= self.last_seq {
            tracing::debug!(
                generation = event.generation,
                seq = event.seq,
                last_seq = self.last_seq,
                "Dropping stale poll event"
            );
            return false;
        }
        let JobState::Processing { job_id, progress } = &self.state else {
            tracing::debug!(state = %self.state.status(), "Ignoring poll event outside processing");
            return false;
        };
        let job_id = job_id.clone();
        let current = *progress;
        self.last_seq = event.seq;

        match event.kind {
            PollEventKind::Tick { progress } => {
                let progress = progress.min(100);
                if progress <= current {
                    if progress < current {
                        tracing::debug!(job_id = %job_id, progress, current, "Ignoring progress regression");
                    }
                    return false;
                }
                tracing::debug!(job_id = %job_id, progress, "Job progress");
                self.enter(JobState::Processing { job_id, progress });
            }
            PollEventKind::Completed { items } => {
                self.scheduler.cancel();
                let invalid = items
                    .iter()
                    .enumerate()
                    .find_map(|(index, item)| item.validate().err().map(|report| (index, report)));
                if let Some((index, report)) = invalid {
                    metrics::counter!("jobs_failed_total").increment(1);
                    tracing::warn!(job_id = %job_id, index, error = %report, "Completed job carries an invalid item");
                    self.enter(JobState::Failed {
                        job_id: Some(job_id),
                        error: format!("Extraction returned an invalid item at index {index}: {report}"),
                    });
                    return true;
                }
                metrics::counter!("jobs_completed_total").increment(1);
                tracing::info!(job_id = %job_id, items = items.len(), "Extraction completed");
                self.enter(JobState::Items {
                    job_id,
                    items: ResultSet::from_items(items),
                });
            }
            PollEventKind::Failed { reason } => {
                self.scheduler.cancel();
                metrics::counter!("jobs_failed_total").increment(1);
                tracing::warn!(job_id = %job_id, reason = %reason, "Job failed");
                self.enter(JobState::Failed {
                    job_id: Some(job_id),
                    error: reason.to_string(),
                });
            }
            PollEventKind::TimedOut => {
                self.scheduler.cancel();
                metrics::counter!("jobs_timed_out_total").increment(1);
                let limit = self.scheduler.settings().max_lifetime;
                tracing::warn!(job_id = %job_id, limit_secs = limit.as_secs(), "Job timed out");
                self.enter(JobState::TimedOut {
                    job_id: Some(job_id),
                    error: format!("Processing timed out after {}s", limit.as_secs()),
                });
            }
        }
        true
    }

    /// Stop a job that is still processing.
    pub fn cancel(&mut self) -> Result<(), WorkflowError> {
        let JobState::Processing { job_id, .. } = &self.state else {
            return Err(WorkflowError::InvalidTransition {
                operation: "cancel",
                state: self.state.status(),
            });
        };
        let job_id = job_id.clone();
        self.scheduler.cancel();
        tracing::info!(job_id = %job_id, "Job cancelled");
        self.enter(JobState::Cancelled { job_id });
        Ok(())
    }

    /// Discard the current job and return to `Idle`. No-op when already idle.
    pub fn reset(&mut self) {
        if matches!(self.state, JobState::Idle) {
            return;
        }
        self.scheduler.cancel();
        self.last_seq = 0;
        tracing::info!(
            job_id = self.state.job_id().map(JobId::as_str),
            from = %self.state.status(),
            "Workflow reset"
        );
        self.enter(JobState::Idle);
    }

    /// Change one field of the item at `index`.
    pub async fn update_field(
        &mut self,
        index: usize,
        field: ItemField,
        value: FieldValue,
    ) -> Result<(), WorkflowError> {
        let patch = ItemPatch::single(field, value)?;
        self.update_item(index, patch).await
    }

    /// Apply `patch` to the item at `index`.
    ///
    /// The edit is shown immediately and confirmed once the backend accepts it.
    /// If the backend rejects it, the item goes back to its last confirmed value.
    pub async fn update_item(&mut self, index: usize, patch: ItemPatch) -> Result<(), WorkflowError> {
        if patch.is_empty() {
            return Err(WorkflowError::Validation("update carries no fields".to_string()));
        }
        patch.validate()?;

        let state = self.state.status();
        let JobState::Items { job_id, items } = &mut self.state else {
            return Err(WorkflowError::InvalidTransition {
                operation: "update an item",
                state,
            });
        };
        items.apply_optimistic(index, &patch)?;
        let job_id = job_id.clone();
        self.announce();

        let outcome = self.client.update(&job_id, index, &patch).await;

        if let JobState::Items { items, .. } = &mut self.state {
            match &outcome {
                Ok(()) => {
                    items.confirm(index);
                    metrics::counter!("items_updated_total").increment(1);
                    tracing::debug!(job_id = %job_id, index, "Item update confirmed");
                }
                Err(err) => {
                    items.rollback(index);
                    tracing::warn!(
                        job_id = %job_id,
                        index,
                        error = %err,
                        "Item update rejected, restored last confirmed value"
                    );
                }
            }
        }
        self.announce();
        outcome.map_err(Into::into)
    }

    /// Delete the item at `index`.
    ///
    /// Unlike updates, the local entry is only removed after the backend
    /// confirms, so positions never drift apart on failure.
    pub async fn delete_item(&mut self, index: usize) -> Result<(), WorkflowError> {
        let state = self.state.status();
        let JobState::Items { job_id, items } = &self.state else {
            return Err(WorkflowError::InvalidTransition {
                operation: "delete an item",
                state,
            });
        };
        items.check_index(index)?;
        let job_id = job_id.clone();

        if let Err(err) = self.client.delete(&job_id, index).await {
            tracing::warn!(job_id = %job_id, index, error = %err, "Item delete rejected");
            return Err(err.into());
        }

        if let JobState::Items { items, .. } = &mut self.state {
            let removed = items.remove(index)?;
            metrics::counter!("items_deleted_total").increment(1);
            tracing::debug!(job_id = %job_id, index, name = %removed.name, remaining = items.len(), "Item deleted");
        }
        self.announce();
        Ok(())
    }

    /// Publish the current items as a storefront.
    ///
    /// Rejected credentials or a failed publish return to `Items` so the user
    /// can retry; a conflict or a vanished job ends the job.
    pub async fn publish(&mut self, credentials: Credentials) -> Result<Storefront, WorkflowError> {
        if !matches!(self.state, JobState::Items { .. }) {
            return Err(WorkflowError::InvalidTransition {
                operation: "publish",
                state: self.state.status(),
            });
        }
        if credentials.email.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "storefront email is required".to_string(),
            ));
        }

        let (job_id, items) = self.take_items();
        tracing::info!(job_id = %job_id, items = items.len(), "Publishing storefront");
        self.enter(JobState::Posting {
            job_id: job_id.clone(),
            items,
        });

        let outcome = self.client.publish(&job_id, &credentials).await;
        let (_, items) = self.take_items();

        match outcome {
            Ok(storefront) => {
                metrics::counter!("storefronts_published_total").increment(1);
                tracing::info!(
                    job_id = %job_id,
                    posted = storefront.posted_count,
                    failed = storefront.failed_count,
                    income = storefront.total_potential_income,
                    "Storefront published"
                );
                self.enter(JobState::Posted {
                    job_id,
                    storefront: storefront.clone(),
                });
                Ok(storefront)
            }
            Err(err) => {
                let next = match &err {
                    ClientError::Timeout(_) => JobState::TimedOut {
                        job_id: Some(job_id.clone()),
                        error: format!("Publishing timed out: {err}"),
                    },
                    ClientError::Conflict(_) | ClientError::NotFound(_) => JobState::Failed {
                        job_id: Some(job_id.clone()),
                        error: format!("Failed to create storefront: {err}"),
                    },
                    _ => JobState::Items {
                        job_id: job_id.clone(),
                        items,
                    },
                };
                tracing::warn!(job_id = %job_id, error = %err, next = %next.status(), "Publish failed");
                self.enter(next);
                Err(err.into())
            }
        }
    }

    /// Move the job id and items out of an `Items`/`Posting` state.
    fn take_items(&mut self) -> (JobId, ResultSet) {
        match std::mem::replace(&mut self.state, JobState::Idle) {
            JobState::Items { job_id, items } | JobState::Posting { job_id, items } => (job_id, items),
            other => {
                let job_id = other.job_id().cloned().unwrap_or_else(|| JobId::new(""));
                self.state = other;
                (job_id, ResultSet::default())
            }
        }
    }

    fn enter(&mut self, next: JobState) {
        tracing::debug!(from = %self.state.status(), to = %next.status(), "Job state transition");
        self.state = next;
        self.announce();
    }

    fn announce(&mut self) {
        if let Some(observer) = &self.observer {
            if observer.send(self.state.clone()).is_err() {
                self.observer = None;
            }
        }
    }
}
