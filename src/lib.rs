//! Ghostcrawl: on-demand page scraping, bounded site crawling and link mapping
//!
//! This crate implements the crawl orchestration core: a job dispatcher that
//! interprets scrape/crawl/map jobs, a shared frontier store that bounds
//! traversal, and a fetch & extract pipeline that turns rendered pages into
//! readable markdown and link lists.

pub mod config;
pub mod crawler;
pub mod job;
pub mod state;
pub mod storage;
pub mod url;

use storage::{FrontierError, QueueError};
use thiserror::Error;

/// Main error type for Ghostcrawl operations
#[derive(Debug, Error)]
pub enum GhostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Frontier error: {0}")]
    Frontier(#[from] FrontierError),

    #[error("Job failed: {0}")]
    Job(#[from] JobError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Malformed submission input, rejected before any job is created
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid URL: {0}")]
    Url(#[from] UrlError),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
        value: u32,
    },
}

/// Navigation, timeout and network failures of a page fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Browser context unavailable: {0}")]
    Context(String),

    #[error("Navigation to {url} timed out after {timeout_ms}ms")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Navigation to {url} failed: {source}")]
    Navigation { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Document at {url} not ready: {reason}")]
    NotReady { url: String, reason: String },

    #[error("Invalid URL: {0}")]
    Url(#[from] UrlError),
}

/// The page was fetched but no readable article could be identified
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("No readable content found at {url}")]
    NoReadableContent { url: String },
}

/// Outcome of a failed pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// Terminal failure of a job
///
/// Every variant ends the job in the `failed` state; the cause is recorded
/// through [`JobError::failure_reason`].
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    Fetch(FetchError),

    #[error("{0}")]
    Extraction(ExtractionError),

    #[error("{0}")]
    FrontierUnavailable(#[from] FrontierError),

    #[error("{0}")]
    Queue(#[from] QueueError),
}

impl JobError {
    /// Short name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "FetchError",
            Self::Extraction(_) => "ExtractionFailed",
            Self::FrontierUnavailable(_) => "FrontierUnavailable",
            Self::Queue(_) => "QueueUnavailable",
        }
    }

    /// Human-readable cause stored as the job's failure reason
    pub fn failure_reason(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

impl From<PipelineError> for JobError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Fetch(e) => Self::Fetch(e),
            PipelineError::Extraction(e) => Self::Extraction(e),
        }
    }
}

/// Result type alias for Ghostcrawl operations
pub type Result<T> = std::result::Result<T, GhostError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Dispatcher, Pipeline, Worker};
pub use job::{Job, JobPayload, Submitter};
pub use state::JobState;
pub use crate::url::{extract_domain, normalize_url, same_host};
