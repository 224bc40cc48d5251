use std::future::Future;
use std::time::Duration;

use reqwest::{multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::AppConfig;
use crate::models::item::ItemPatch;
use crate::models::job::{ErrorBody, JobId, StatusPayload, SubmitResponse};
use crate::models::storefront::{Credentials, PublishRequest, Storefront};

/// Binary upload handed to the backend for analysis.
#[derive(Debug, Clone)]
pub struct Asset {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Asset {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "application/octet-stream".to_string(),
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Requests against the job backend. Implementations hold no workflow state
/// and never retry on their own.
pub trait JobClient: Send + Sync + 'static {
    /// Upload an asset and return the identifier of the job analysing it.
    fn submit(&self, asset: Asset) -> impl Future<Output = Result<JobId, ClientError>> + Send;

    /// Query the current status of a job.
    fn status(
        &self,
        job_id: &JobId,
    ) -> impl Future<Output = Result<StatusPayload, ClientError>> + Send;

    /// Apply a partial update to the item at `index`.
    fn update(
        &self,
        job_id: &JobId,
        index: usize,
        fields: &ItemPatch,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Remove the item at `index`; later items shift down by one.
    fn delete(
        &self,
        job_id: &JobId,
        index: usize,
    ) -> impl Future<Output = Result<(), ClientError>> + Send;

    /// Publish the job's current items as a storefront.
    fn publish(
        &self,
        job_id: &JobId,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Storefront, ClientError>> + Send;
}

/// [`JobClient`] speaking the backend's HTTP contract.
pub struct HttpJobClient {
    http: Client,
    base_url: String,
}

impl HttpJobClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(concat!("listing-flow/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        Self::new(&config.backend_url, config.request_timeout())
    }

    fn item_url(&self, job_id: &JobId, index: usize) -> String {
        format!("{}/jobs/{}/items/{}", self.base_url, job_id, index)
    }
}

impl JobClient for HttpJobClient {
    async fn submit(&self, asset: Asset) -> Result<JobId, ClientError> {
        let part = multipart::Part::bytes(asset.bytes)
            .file_name(asset.filename)
            .mime_str(&asset.content_type)
            .map_err(|e| ClientError::Submission(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/jobs", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| match ClientError::from(e) {
                ClientError::Timeout(message) => ClientError::Timeout(message),
                other => ClientError::Submission(other.to_string()),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = failure_detail(response).await;
            return Err(ClientError::Submission(format!("HTTP {status}: {detail}")));
        }

        let body: SubmitResponse = decode(response).await?;
        Ok(body.job_id)
    }

    async fn status(&self, job_id: &JobId) -> Result<StatusPayload, ClientError> {
        let response = self
            .http
            .get(format!("{}/jobs/{}/status", self.base_url, job_id))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => decode(response).await,
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(failure_detail(response).await)),
            status => Err(ClientError::Status {
                status: status.as_u16(),
                message: failure_detail(response).await,
            }),
        }
    }

    async fn update(
        &self,
        job_id: &JobId,
        index: usize,
        fields: &ItemPatch,
    ) -> Result<(), ClientError> {
        let response = self
            .http
            .put(self.item_url(job_id, index))
            .json(fields)
            .send()
            .await?;
        mutation_outcome(response).await
    }

    async fn delete(&self, job_id: &JobId, index: usize) -> Result<(), ClientError> {
        let response = self.http.delete(self.item_url(job_id, index)).send().await?;
        mutation_outcome(response).await
    }

    async fn publish(
        &self,
        job_id: &JobId,
        credentials: &Credentials,
    ) -> Result<Storefront, ClientError> {
        let response = self
            .http
            .post(format!("{}/jobs/{}/publish", self.base_url, job_id))
            .json(&PublishRequest {
                credentials: credentials.clone(),
            })
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => decode(response).await,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(ClientError::Auth(failure_detail(response).await))
            }
            StatusCode::CONFLICT => Err(ClientError::Conflict(failure_detail(response).await)),
            _ => Err(ClientError::Publish(failure_detail(response).await)),
        }
    }
}

async fn mutation_outcome(response: Response) -> Result<(), ClientError> {
    match response.status() {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err(ClientError::NotFound(failure_detail(response).await)),
        StatusCode::CONFLICT => Err(ClientError::Conflict(failure_detail(response).await)),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            Err(ClientError::Validation(failure_detail(response).await))
        }
        status => Err(ClientError::Status {
            status: status.as_u16(),
            message: failure_detail(response).await,
        }),
    }
}

/// Decode a JSON body. Transport failures and malformed payloads are kept apart.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Decode)
}

/// Server-supplied message of a failed response, or the status reason.
async fn failure_detail(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => body.detail,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Upload rejected: {0}")]
    Submission(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Job is not editable: {0}")]
    Conflict(String),

    #[error("Request rejected: {0}")]
    Validation(String),

    #[error("Storefront credentials rejected: {0}")]
    Auth(String),

    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}
