use crate::crawler::FetchResult;
use crate::state::JobState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three request shapes a job can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    Scrape,
    Crawl,
    Map,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::Crawl => "crawl",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mode-specific job data, stored as the job's JSON payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum JobPayload {
    /// Single page, full extraction, no session
    Scrape { url: String },

    /// Depth- and count-bounded traversal
    Crawl {
        url: String,
        #[serde(rename = "crawlId")]
        crawl_id: String,
        depth: u32,
        #[serde(rename = "maxDepth")]
        max_depth: u32,
        limit: u32,
    },

    /// Link graph of a whole domain, deduplicated by the transport
    Map {
        url: String,
        #[serde(rename = "crawlId")]
        crawl_id: String,
        limit: u32,
    },
}

impl JobPayload {
    pub fn mode(&self) -> JobMode {
        match self {
            Self::Scrape { .. } => JobMode::Scrape,
            Self::Crawl { .. } => JobMode::Crawl,
            Self::Map { .. } => JobMode::Map,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Scrape { url } | Self::Crawl { url, .. } | Self::Map { url, .. } => url,
        }
    }

    /// Session identifier; absent for scrape jobs
    pub fn crawl_id(&self) -> Option<&str> {
        match self {
            Self::Scrape { .. } => None,
            Self::Crawl { crawl_id, .. } | Self::Map { crawl_id, .. } => Some(crawl_id),
        }
    }

    /// Job type name used by the queue transport
    pub fn job_type(&self) -> &'static str {
        match self {
            Self::Scrape { .. } => "scrape-job",
            Self::Crawl { .. } => "crawl-job",
            Self::Map { .. } => "map-job",
        }
    }
}

/// A claimed unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Assigned by the queue transport
    pub id: String,
    pub payload: JobPayload,
}

/// Result message for a job that ended without fetching
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skipped {
    pub message: String,
}

/// Terminal result of a completed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutput {
    Page(FetchResult),
    Skipped(Skipped),
}

impl JobOutput {
    pub fn limit_reached() -> Self {
        Self::Skipped(Skipped {
            message: "limit reached".to_string(),
        })
    }

    pub fn already_visited() -> Self {
        Self::Skipped(Skipped {
            message: "already visited".to_string(),
        })
    }

    pub fn depth_exceeded() -> Self {
        Self::Skipped(Skipped {
            message: "depth exceeded".to_string(),
        })
    }

    /// Returns the fetched page, if the job performed a fetch
    pub fn page(&self) -> Option<&FetchResult> {
        match self {
            Self::Page(page) => Some(page),
            Self::Skipped(_) => None,
        }
    }

    pub fn skip_message(&self) -> Option<&str> {
        match self {
            Self::Skipped(skipped) => Some(&skipped.message),
            Self::Page(_) => None,
        }
    }
}

/// A job as recorded by the queue transport
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub id: String,
    pub payload: JobPayload,
    pub state: JobState,
    pub result: Option<JobOutput>,
    pub failure_reason: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: String,
    pub finished_at: Option<String>,
}
