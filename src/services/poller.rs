//! Status polling for a single in-flight job.
//!
//! A [`PollScheduler`] runs at most one polling loop at a time. The loop lives
//! in a spawned task and reports back through a channel owned by the
//! [`PollHandle`]; dropping the handle aborts the task, so every way out of
//! polling (terminal status, timeout, cancel, reset) releases the timer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::models::item::ExtractedItem;
use crate::models::job::{JobId, StatusPayload};
use crate::services::job_client::JobClient;

/// Timing of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between two status queries; the first query runs one interval after start.
    pub interval: Duration,
    /// Lifetime of the loop, measured from start.
    pub max_lifetime: Duration,
}

impl PollSettings {
    /// Both durations must be non-zero for the loop's timers.
    pub fn check(&self) -> Result<(), PollError> {
        if self.interval.is_zero() || self.max_lifetime.is_zero() {
            return Err(PollError::InvalidSettings(*self));
        }
        Ok(())
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_lifetime: Duration::from_secs(300),
        }
    }
}

/// One report from the polling loop, stamped so stale reports can be discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct PollEvent {
    /// Which `start` call produced this event.
    pub generation: u64,
    /// Monotonic within a generation, starting at 1.
    pub seq: u64,
    pub kind: PollEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollEventKind {
    Tick { progress: u8 },
    Completed { items: Vec<ExtractedItem> },
    Failed { reason: PollFailure },
    TimedOut,
}

impl PollEventKind {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollEventKind::Tick { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollFailure {
    /// The backend reported the job as failed.
    Job(String),
    /// The status query itself failed.
    Transport(String),
}

impl fmt::Display for PollFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollFailure::Job(message) => write!(f, "Extraction failed: {message}"),
            PollFailure::Transport(message) => write!(f, "Failed to check status: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("Already polling job {0}")]
    AlreadyPolling(JobId),

    #[error("Poll interval and lifetime must be non-zero, got {0:?}")]
    InvalidSettings(PollSettings),
}

/// Owned handle to a running polling loop.
pub struct PollHandle {
    job_id: JobId,
    generation: u64,
    events: mpsc::UnboundedReceiver<PollEvent>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct PollScheduler<C> {
    client: Arc<C>,
    settings: PollSettings,
    active: Option<PollHandle>,
    generation: u64,
}

impl<C: JobClient> PollScheduler<C> {
    pub fn new(client: Arc<C>, settings: PollSettings) -> Self {
        Self {
            client,
            settings,
            active: None,
            generation: 0,
        }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Generation of the most recent `start`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_job(&self) -> Option<&JobId> {
        self.active.as_ref().map(PollHandle::job_id)
    }

    /// Begin polling `job_id`. Returns the generation stamped on its events.
    pub fn start(&mut self, job_id: JobId) -> Result<u64, PollError> {
        if let Some(active) = &self.active {
            return Err(PollError::AlreadyPolling(active.job_id.clone()));
        }
        self.settings.check()?;

        self.generation += 1;
        let generation = self.generation;
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_poll_loop(
            Arc::clone(&self.client),
            job_id.clone(),
            self.settings,
            generation,
            tx,
        ));

        tracing::debug!(
            job_id = %job_id,
            generation,
            interval_ms = self.settings.interval.as_millis() as u64,
            max_lifetime_secs = self.settings.max_lifetime.as_secs(),
            "Poll loop started"
        );

        self.active = Some(PollHandle {
            job_id,
            generation,
            events: rx,
            task,
        });
        Ok(generation)
    }

    /// Wait for the next event of the active loop.
    ///
    /// Returns `None` when nothing is polling. A terminal event releases the
    /// loop, so nothing follows it. Cancel-safe.
    pub async fn next_event(&mut self) -> Option<PollEvent> {
        let handle = self.active.as_mut()?;
        match handle.events.recv().await {
            Some(event) => {
                if event.kind.is_terminal() {
                    self.active = None;
                }
                Some(event)
            }
            None => {
                self.active = None;
                None
            }
        }
    }

    /// Stop the active loop. Idempotent; returns whether a loop was running.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(handle) => {
                tracing::debug!(job_id = %handle.job_id, generation = handle.generation, "Poll loop cancelled");
                true
            }
            None => false,
        }
    }
}

async fn run_poll_loop<C: JobClient>(
    client: Arc<C>,
    job_id: JobId,
    settings: PollSettings,
    generation: u64,
    events: mpsc::UnboundedSender<PollEvent>,
) {
    let deadline = time::sleep(settings.max_lifetime);
    tokio::pin!(deadline);

    let mut ticker = time::interval_at(Instant::now() + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut seq = 0u64;
    let emit = |seq: u64, kind: PollEventKind| {
        let terminal = kind.is_terminal();
        let delivered = events
            .send(PollEvent {
                generation,
                seq,
                kind,
            })
            .is_ok();
        delivered && !terminal
    };

    loop {
        tokio::select! {
            biased;
            _ = &mut deadline => {
                tracing::warn!(job_id = %job_id, "Job exceeded its maximum lifetime");
                emit(seq + 1, PollEventKind::TimedOut);
                return;
            }
            _ = ticker.tick() => {}
        }

        seq += 1;
        let result = tokio::select! {
            biased;
            _ = &mut deadline => {
                tracing::warn!(job_id = %job_id, "Job exceeded its maximum lifetime during a status query");
                emit(seq, PollEventKind::TimedOut);
                return;
            }
            result = client.status(&job_id) => result,
        };

        let kind = match result {
            Ok(StatusPayload::Processing { progress }) => {
                tracing::trace!(job_id = %job_id, seq, progress, "Job still processing");
                PollEventKind::Tick { progress }
            }
            Ok(StatusPayload::Completed { items, .. }) => PollEventKind::Completed { items },
            Ok(StatusPayload::Failed { error, .. }) => PollEventKind::Failed {
                reason: PollFailure::Job(error),
            },
            Err(err) => {
                tracing::warn!(job_id = %job_id, seq, error = %err, "Status query failed, stopping poll loop");
                PollEventKind::Failed {
                    reason: PollFailure::Transport(err.to_string()),
                }
            }
        };

        if !emit(seq, kind) {
            return;
        }
    }
}
