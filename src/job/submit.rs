//! Asynchronous submission entry points
//!
//! Each `submit_*` call validates its input, creates the seed job and returns
//! immediately with the identifiers the caller polls with [`Submitter::get_job_status`].

use crate::config::LimitsConfig;
use crate::job::types::{JobOutput, JobPayload};
use crate::state::JobState;
use crate::storage::{EnqueueOptions, JobQueue};
use crate::url::normalize_url;
use crate::{GhostError, ValidationError};
use serde::Serialize;
use std::sync::Arc;
use url::Url;

/// Identifiers returned by a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crawl_id: Option<String>,
}

/// Snapshot of a job for status polling
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
    pub id: String,
    pub state: JobState,
    pub result: Option<JobOutput>,
    pub error: Option<String>,
}

/// Creates seed jobs on a queue transport
pub struct Submitter {
    queue: Arc<dyn JobQueue>,
    limits: LimitsConfig,
}

impl Submitter {
    pub fn new(queue: Arc<dyn JobQueue>, limits: LimitsConfig) -> Self {
        Self { queue, limits }
    }

    /// Submits a single-page scrape
    pub fn submit_scrape(&self, url: &str) -> Result<Submission, GhostError> {
        let url = validate_url(url)?;

        let payload = JobPayload::Scrape {
            url: url.to_string(),
        };
        let job_id = self
            .queue
            .enqueue(&payload, EnqueueOptions::default())?
            .job_id()
            .to_string();

        tracing::info!("Scrape job {} submitted for {}", job_id, url);
        Ok(Submission {
            job_id,
            crawl_id: None,
        })
    }

    /// Submits a depth- and count-bounded crawl seeded at `url`
    pub fn submit_crawl(
        &self,
        url: &str,
        max_depth: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Submission, GhostError> {
        let url = validate_url(url)?;
        let max_depth = validate_range(
            "maxDepth",
            max_depth.unwrap_or(self.limits.default_max_depth),
            self.limits.max_max_depth,
        )?;
        let limit = validate_range(
            "limit",
            limit.unwrap_or(self.limits.default_limit),
            self.limits.max_limit,
        )?;

        let crawl_id = uuid::Uuid::new_v4().to_string();
        let payload = JobPayload::Crawl {
            url: url.to_string(),
            crawl_id: crawl_id.clone(),
            depth: 0,
            max_depth,
            limit,
        };
        let job_id = self
            .queue
            .enqueue(&payload, EnqueueOptions::default())?
            .job_id()
            .to_string();

        tracing::info!(
            "Crawl {} submitted for {} (maxDepth={}, limit={}, job {})",
            crawl_id,
            url,
            max_depth,
            limit,
            job_id
        );
        Ok(Submission {
            job_id,
            crawl_id: Some(crawl_id),
        })
    }

    /// Submits a link map of the domain of `url`
    ///
    /// The seed is keyed by its own URL so that a page linking back to the
    /// seed cannot create a second job for it.
    pub fn submit_map(&self, url: &str, limit: Option<u32>) -> Result<Submission, GhostError> {
        let url = validate_url(url)?;
        let limit = validate_range(
            "limit",
            limit.unwrap_or(self.limits.default_limit),
            self.limits.max_limit,
        )?;

        let crawl_id = uuid::Uuid::new_v4().to_string();
        let payload = JobPayload::Map {
            url: url.to_string(),
            crawl_id: crawl_id.clone(),
            limit,
        };
        let job_id = self
            .queue
            .enqueue(&payload, EnqueueOptions::keyed(url.as_str()))?
            .job_id()
            .to_string();

        tracing::info!(
            "Map {} submitted for {} (limit={}, job {})",
            crawl_id,
            url,
            limit,
            job_id
        );
        Ok(Submission {
            job_id,
            crawl_id: Some(crawl_id),
        })
    }

    /// Returns state, result and error of a job, or None if it is unknown
    pub fn get_job_status(&self, id: &str) -> Result<Option<JobStatus>, GhostError> {
        let status = self.queue.get_job(id)?.map(|record| JobStatus {
            id: record.id,
            state: record.state,
            result: record.result,
            error: record.failure_reason,
        });
        Ok(status)
    }
}

fn validate_url(url: &str) -> Result<Url, ValidationError> {
    Ok(normalize_url(url)?)
}

fn validate_range(field: &'static str, value: u32, max: u32) -> Result<u32, ValidationError> {
    if value < 1 || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            min: 1,
            max,
            value,
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    fn submitter() -> (Arc<SqliteStorage>, Submitter) {
        let storage = Arc::new(SqliteStorage::new_in_memory().unwrap());
        let submitter = Submitter::new(storage.clone(), LimitsConfig::default());
        (storage, submitter)
    }

    #[test]
    fn test_submit_scrape_creates_pending_job() {
        let (_storage, submitter) = submitter();
        let submission = submitter.submit_scrape("https://x.test/page/").unwrap();
        assert!(submission.crawl_id.is_none());

        let status = submitter.get_job_status(&submission.job_id).unwrap().unwrap();
        assert_eq!(status.state, JobState::Pending);
        assert!(status.result.is_none());
        assert!(status.error.is_none());
    }

    #[test]
    fn test_submit_crawl_seeds_depth_zero() {
        let (storage, submitter) = submitter();
        let submission = submitter
            .submit_crawl("https://x.test/", Some(3), Some(25))
            .unwrap();

        let record = storage.get_job(&submission.job_id).unwrap().unwrap();
        match record.payload {
            JobPayload::Crawl {
                url,
                crawl_id,
                depth,
                max_depth,
                limit,
            } => {
                assert_eq!(url, "https://x.test/");
                assert_eq!(Some(crawl_id), submission.crawl_id);
                assert_eq!(depth, 0);
                assert_eq!(max_depth, 3);
                assert_eq!(limit, 25);
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[test]
    fn test_submit_crawl_uses_defaults() {
        let (storage, submitter) = submitter();
        let submission = submitter.submit_crawl("https://x.test/", None, None).unwrap();

        let record = storage.get_job(&submission.job_id).unwrap().unwrap();
        assert!(matches!(
            record.payload,
            JobPayload::Crawl {
                max_depth: 2,
                limit: 10,
                ..
            }
        ));
    }

    #[test]
    fn test_submit_rejects_bad_input() {
        let (_storage, submitter) = submitter();

        assert!(matches!(
            submitter.submit_scrape("not a url"),
            Err(GhostError::Validation(ValidationError::Url(_)))
        ));
        assert!(matches!(
            submitter.submit_scrape("ftp://x.test/"),
            Err(GhostError::Validation(_))
        ));
        assert!(matches!(
            submitter.submit_crawl("https://x.test/", Some(0), None),
            Err(GhostError::Validation(ValidationError::OutOfRange {
                field: "maxDepth",
                ..
            }))
        ));
        assert!(matches!(
            submitter.submit_crawl("https://x.test/", Some(11), None),
            Err(GhostError::Validation(_))
        ));
        assert!(matches!(
            submitter.submit_map("https://x.test/", Some(101)),
            Err(GhostError::Validation(ValidationError::OutOfRange {
                field: "limit",
                ..
            }))
        ));
    }

    #[test]
    fn test_rejected_submission_creates_no_job() {
        let (storage, submitter) = submitter();
        let _ = submitter.submit_crawl("https://x.test/", Some(99), None);
        assert_eq!(storage.count_by_state(JobState::Pending).unwrap(), 0);
    }

    #[test]
    fn test_submit_map_keys_seed_by_url() {
        let (storage, submitter) = submitter();
        let submission = submitter.submit_map("https://x.test/", None).unwrap();

        let record = storage.get_job(&submission.job_id).unwrap().unwrap();
        assert_eq!(record.idempotency_key.as_deref(), Some("https://x.test/"));
    }

    #[test]
    fn test_unknown_job_status() {
        let (_storage, submitter) = submitter();
        assert!(submitter.get_job_status("missing").unwrap().is_none());
    }
}
