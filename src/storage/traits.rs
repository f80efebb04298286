//! Storage traits and error types
//!
//! [`FrontierStore`] and [`JobQueue`] are the two collaborators the dispatcher
//! shares with every other worker. Both must tolerate concurrent callers.

use crate::job::{Job, JobOutput, JobPayload, JobRecord};
use crate::state::JobState;
use thiserror::Error;

/// Errors raised by the frontier store
#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("Frontier store unavailable: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Errors raised by the job queue transport
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Invalid state transition for job {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: JobState,
        to: JobState,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt job record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Result type for frontier operations
pub type FrontierResult<T> = Result<T, FrontierError>;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Session-scoped visited set and visit count
///
/// The three operations are independent calls, not one atomic
/// check-and-set; callers must tolerate another worker acting between them.
pub trait FrontierStore: Send + Sync {
    /// Number of URLs recorded for the session
    fn cardinality(&self, crawl_id: &str) -> FrontierResult<u64>;

    /// Returns true if `url` is recorded for the session
    fn is_member(&self, crawl_id: &str, url: &str) -> FrontierResult<bool>;

    /// Records `url` for the session; recording an existing member is a no-op
    fn add(&self, crawl_id: &str, url: &str) -> FrontierResult<()>;
}

/// Options accepted by [`JobQueue::enqueue`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    /// At most one job ever exists per key within a session
    pub idempotency_key: Option<String>,
}

impl EnqueueOptions {
    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            idempotency_key: Some(key.into()),
        }
    }
}

/// Outcome of an enqueue that honours idempotency keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueResult {
    /// A new job was created
    Created(String),
    /// A job with the same key already exists in the session
    Duplicate(String),
}

impl EnqueueResult {
    /// Get the job ID regardless of whether it was created or duplicate
    pub fn job_id(&self) -> &str {
        match self {
            EnqueueResult::Created(id) | EnqueueResult::Duplicate(id) => id,
        }
    }

    /// Returns true if this was a newly created job
    pub fn is_created(&self) -> bool {
        matches!(self, EnqueueResult::Created(_))
    }
}

/// Durable job queue transport
pub trait JobQueue: Send + Sync {
    /// Creates a pending job unless its idempotency key is already taken
    fn enqueue(&self, payload: &JobPayload, options: EnqueueOptions)
        -> QueueResult<EnqueueResult>;

    /// Gets a job by ID
    fn get_job(&self, id: &str) -> QueueResult<Option<JobRecord>>;

    /// Moves the oldest pending job to active and returns it
    ///
    /// A job is handed to exactly one caller.
    fn claim_next(&self) -> QueueResult<Option<Job>>;

    /// Moves an active job to completed with its result
    fn complete(&self, id: &str, output: &JobOutput) -> QueueResult<()>;

    /// Moves an active job to failed with a human-readable cause
    fn fail(&self, id: &str, reason: &str) -> QueueResult<()>;

    /// Counts jobs in a given state
    fn count_by_state(&self, state: JobState) -> QueueResult<u64>;

    /// Gets all jobs of a crawl or map session in creation order
    fn session_jobs(&self, crawl_id: &str) -> QueueResult<Vec<JobRecord>>;
}
