//! Test doubles and helpers shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use listing_flow::{
    app_state::AppState,
    models::item::ItemPatch,
    models::job::{JobId, StatusPayload},
    models::storefront::{Credentials, PostedListing, Storefront},
    routes,
    services::analyzer::Analyzer,
    services::job_client::{Asset, ClientError, JobClient},
    services::job_store::JobStore,
    workflow::JobState,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// A request seen by [`ScriptedClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Submit(String),
    Status(JobId),
    Update {
        job_id: JobId,
        index: usize,
        patch: ItemPatch,
    },
    Delete {
        job_id: JobId,
        index: usize,
    },
    Publish {
        job_id: JobId,
        email: String,
    },
}

/// [`JobClient`] answering from per-operation queues.
///
/// Empty queues fall back to: job id `abc`, `processing` at 0%, accepted
/// mutations, and a rejected publish.
#[derive(Default)]
pub struct ScriptedClient {
    submits: Mutex<VecDeque<Result<JobId, ClientError>>>,
    statuses: Mutex<VecDeque<Result<StatusPayload, ClientError>>>,
    updates: Mutex<VecDeque<Result<(), ClientError>>>,
    deletes: Mutex<VecDeque<Result<(), ClientError>>>,
    publishes: Mutex<VecDeque<Result<Storefront, ClientError>>>,
    status_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(self, statuses: impl IntoIterator<Item = StatusPayload>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .extend(statuses.into_iter().map(Ok));
        self
    }

    pub fn push_submit(&self, result: Result<JobId, ClientError>) {
        self.submits.lock().unwrap().push_back(result);
    }

    pub fn push_status(&self, result: Result<StatusPayload, ClientError>) {
        self.statuses.lock().unwrap().push_back(result);
    }

    pub fn push_update(&self, result: Result<(), ClientError>) {
        self.updates.lock().unwrap().push_back(result);
    }

    pub fn push_delete(&self, result: Result<(), ClientError>) {
        self.deletes.lock().unwrap().push_back(result);
    }

    pub fn push_publish(&self, result: Result<Storefront, ClientError>) {
        self.publishes.lock().unwrap().push_back(result);
    }

    /// Make every status query take `delay` of (virtual) time.
    pub fn set_status_delay(&self, delay: Duration) {
        *self.status_delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, Call::Status(_)))
            .count()
    }

    /// Calls other than status queries.
    pub fn mutation_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::Status(_) | Call::Submit(_)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl JobClient for ScriptedClient {
    async fn submit(&self, asset: Asset) -> Result<JobId, ClientError> {
        self.record(Call::Submit(asset.filename));
        let next = self.submits.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(JobId::new("abc")))
    }

    async fn status(&self, job_id: &JobId) -> Result<StatusPayload, ClientError> {
        self.record(Call::Status(job_id.clone()));
        let delay = *self.status_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.statuses.lock().unwrap().pop_front();
        next.unwrap_or(Ok(StatusPayload::Processing { progress: 0 }))
    }

    async fn update(
        &self,
        job_id: &JobId,
        index: usize,
        fields: &ItemPatch,
    ) -> Result<(), ClientError> {
        self.record(Call::Update {
            job_id: job_id.clone(),
            index,
            patch: fields.clone(),
        });
        let next = self.updates.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn delete(&self, job_id: &JobId, index: usize) -> Result<(), ClientError> {
        self.record(Call::Delete {
            job_id: job_id.clone(),
            index,
        });
        let next = self.deletes.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }

    async fn publish(
        &self,
        job_id: &JobId,
        credentials: &Credentials,
    ) -> Result<Storefront, ClientError> {
        self.record(Call::Publish {
            job_id: job_id.clone(),
            email: credentials.email.clone(),
        });
        let next = self.publishes.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(ClientError::Publish("no storefront scripted".to_string())))
    }
}

/// A storefront listing every given item name.
pub fn storefront_for(names: &[&str]) -> Storefront {
    let listings: Vec<PostedListing> = names
        .iter()
        .map(|name| PostedListing {
            title: name.to_string(),
            original_price: 30.0,
            rental_price: 1.0,
            category: "misc".to_string(),
            condition: "good".to_string(),
            status: "live".to_string(),
        })
        .collect();
    Storefront {
        platform: "UseThis".to_string(),
        posted_count: listings.len(),
        failed_count: 0,
        total_potential_income: 30.0 * listings.len() as f64,
        listings,
        failed_listings: Vec::new(),
        message: None,
        published_at: Utc::now(),
    }
}

pub fn video() -> Asset {
    Asset::new("living-room.mp4", vec![0x00, 0x00, 0x00, 0x18, 0x66, 0x74, 0x79, 0x70])
        .with_content_type("video/mp4")
}

/// Drain every state the controller has announced so far.
pub fn drain_states(rx: &mut UnboundedReceiver<JobState>) -> Vec<JobState> {
    let mut states = Vec::new();
    while let Ok(state) = rx.try_recv() {
        states.push(state);
    }
    states
}

/// Serve the reference backend on an ephemeral local port and return its base URL.
pub async fn spawn_backend(analyzer: impl Analyzer + 'static) -> String {
    let state = AppState::new(JobStore::new(), analyzer, 1024 * 1024);
    let app = routes::api_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Test server error");
    });
    format!("http://{addr}")
}
