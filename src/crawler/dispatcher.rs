//! Job dispatcher: drives one job to its terminal outcome
//!
//! Crawl and map jobs consult the frontier before fetching:
//!
//! 1. stop with "limit reached" when the session has visited `limit` URLs
//! 2. stop with "already visited" when the URL is in the visited set
//! 3. add the URL to the visited set, then fetch
//!
//! The three frontier calls are separate. Two workers may both pass step 2
//! for the same URL and fetch it twice; the session count can then exceed
//! `limit` by at most the number of racing workers. Map mode keeps job
//! creation strictly unique by keying every child on its URL.
//!
//! A crawl job deeper than its `max_depth` is skipped with "depth exceeded"
//! before the frontier is touched.

use crate::crawler::pipeline::{ExtractMode, Pipeline};
use crate::job::{Job, JobOutput, JobPayload};
use crate::storage::{EnqueueOptions, FrontierStore, JobQueue};
use crate::url::{normalize_url, same_host};
use crate::{FetchError, JobError};
use std::sync::Arc;
use url::Url;

/// Outcome of a successfully processed job
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub output: JobOutput,
    /// Child jobs created while processing
    pub children: usize,
}

impl Dispatch {
    fn leaf(output: JobOutput) -> Self {
        Self {
            output,
            children: 0,
        }
    }
}

pub struct Dispatcher {
    frontier: Arc<dyn FrontierStore>,
    queue: Arc<dyn JobQueue>,
    pipeline: Pipeline,
}

impl Dispatcher {
    pub fn new(
        frontier: Arc<dyn FrontierStore>,
        queue: Arc<dyn JobQueue>,
        pipeline: Pipeline,
    ) -> Self {
        Self {
            frontier,
            queue,
            pipeline,
        }
    }

    /// Processes one job
    ///
    /// Errors are terminal for the job. Children enqueued before an error
    /// stay enqueued.
    pub async fn process(&mut self, job: &Job) -> Result<Dispatch, JobError> {
        match &job.payload {
            JobPayload::Scrape { url } => {
                let target = job_url(url)?;
                let page = self.pipeline.run(&target, ExtractMode::Full).await?;
                Ok(Dispatch::leaf(JobOutput::Page(page)))
            }
            JobPayload::Crawl {
                url,
                crawl_id,
                depth,
                max_depth,
                limit,
            } => {
                self.crawl(url, crawl_id, *depth, *max_depth, *limit)
                    .await
            }
            JobPayload::Map {
                url,
                crawl_id,
                limit,
            } => self.map(url, crawl_id, *limit).await,
        }
    }

    /// Releases the pipeline's browser context
    pub async fn shutdown(&mut self) {
        self.pipeline.shutdown().await;
    }

    async fn crawl(
        &mut self,
        url: &str,
        crawl_id: &str,
        depth: u32,
        max_depth: u32,
        limit: u32,
    ) -> Result<Dispatch, JobError> {
        let target = job_url(url)?;

        if depth > max_depth {
            tracing::warn!(
                "Crawl {}: {} at depth {} beyond max depth {}",
                crawl_id,
                target,
                depth,
                max_depth
            );
            return Ok(Dispatch::leaf(JobOutput::depth_exceeded()));
        }

        if let Some(skipped) = self.reserve(crawl_id, &target, limit)? {
            return Ok(Dispatch::leaf(skipped));
        }

        let page = self.pipeline.run(&target, ExtractMode::Full).await?;

        let mut children = 0;
        if depth < max_depth {
            for link in same_host_links(&page.links, &target) {
                let child = JobPayload::Crawl {
                    url: link.to_string(),
                    crawl_id: crawl_id.to_string(),
                    depth: depth + 1,
                    max_depth,
                    limit,
                };
                self.queue.enqueue(&child, EnqueueOptions::default())?;
                children += 1;
            }
        }

        tracing::debug!(
            "Crawl {} depth {}: {} emitted {} children",
            crawl_id,
            depth,
            target,
            children
        );

        Ok(Dispatch {
            output: JobOutput::Page(page),
            children,
        })
    }

    async fn map(&mut self, url: &str, crawl_id: &str, limit: u32) -> Result<Dispatch, JobError> {
        let target = job_url(url)?;

        if let Some(skipped) = self.reserve(crawl_id, &target, limit)? {
            return Ok(Dispatch::leaf(skipped));
        }

        let page = self.pipeline.run(&target, ExtractMode::LinksOnly).await?;

        let mut children = 0;
        for link in same_host_links(&page.links, &target) {
            // Saves a transport call; uniqueness comes from the key
            if self.frontier.is_member(crawl_id, link)? {
                continue;
            }

            let child = JobPayload::Map {
                url: link.to_string(),
                crawl_id: crawl_id.to_string(),
                limit,
            };
            if self
                .queue
                .enqueue(&child, EnqueueOptions::keyed(link))?
                .is_created()
            {
                children += 1;
            }
        }

        tracing::debug!("Map {}: {} created {} children", crawl_id, target, children);

        Ok(Dispatch {
            output: JobOutput::Page(page),
            children,
        })
    }

    /// Runs the limit and visited checks and records the URL
    ///
    /// Returns the skip result when the job must not fetch.
    fn reserve(
        &self,
        crawl_id: &str,
        target: &Url,
        limit: u32,
    ) -> Result<Option<JobOutput>, JobError> {
        let count = self.frontier.cardinality(crawl_id)?;
        if count >= u64::from(limit) {
            tracing::debug!("Session {} at {}/{}: limit reached", crawl_id, count, limit);
            return Ok(Some(JobOutput::limit_reached()));
        }

        if self.frontier.is_member(crawl_id, target.as_str())? {
            tracing::debug!("Session {}: {} already visited", crawl_id, target);
            return Ok(Some(JobOutput::already_visited()));
        }

        self.frontier.add(crawl_id, target.as_str())?;
        Ok(None)
    }
}

fn job_url(url: &str) -> Result<Url, JobError> {
    normalize_url(url).map_err(|e| JobError::Fetch(FetchError::from(e)))
}

/// Links on the host of `page_url`, excluding the page itself
fn same_host_links<'a>(links: &'a [String], page_url: &'a Url) -> impl Iterator<Item = &'a str> {
    links.iter().filter_map(move |link| {
        let parsed = Url::parse(link).ok()?;
        (same_host(&parsed, page_url) && parsed != *page_url).then_some(link.as_str())
    })
}
