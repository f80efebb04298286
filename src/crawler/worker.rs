//! Worker loop
//!
//! A worker claims jobs from the shared queue one at a time, hands them to
//! its own [`Dispatcher`] and records the terminal outcome.

use crate::config::Config;
use crate::crawler::dispatcher::Dispatcher;
use crate::crawler::pipeline::Pipeline;
use crate::job::Job;
use crate::state::JobState;
use crate::storage::{JobQueue, QueueError, SqliteStorage};
use crate::JobError;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct Worker {
    id: usize,
    queue: Arc<dyn JobQueue>,
    dispatcher: Dispatcher,
    poll_interval: Duration,
}

impl Worker {
    pub fn new(
        id: usize,
        queue: Arc<dyn JobQueue>,
        dispatcher: Dispatcher,
        poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            queue,
            dispatcher,
            poll_interval,
        }
    }

    /// Builds a worker with its own browser session over shared storage
    pub fn from_config(id: usize, config: &Config, storage: Arc<SqliteStorage>) -> Self {
        let queue: Arc<dyn JobQueue> = storage.clone();
        let dispatcher = Dispatcher::new(storage, Arc::clone(&queue), Pipeline::from_config(config));
        Self::new(id, queue, dispatcher, config.worker.poll_interval())
    }

    /// Claims and executes the next pending job
    ///
    /// Returns false when no job was pending.
    pub async fn process_next(&mut self) -> Result<bool, QueueError> {
        match self.queue.claim_next()? {
            Some(job) => {
                self.execute(job).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Runs until `shutdown` turns true, then releases the browser context
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Worker {} started", self.id);

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.process_next().await {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => tracing::error!("Worker {}: queue error: {}", self.id, e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.dispatcher.shutdown().await;
        tracing::info!("Worker {} stopped", self.id);
    }

    /// Processes jobs until none is pending or active anywhere
    ///
    /// Returns the number of jobs this worker executed.
    pub async fn run_until_idle(&mut self) -> Result<usize, QueueError> {
        let mut processed = 0;

        loop {
            if self.process_next().await? {
                processed += 1;
                continue;
            }

            let outstanding = self.queue.count_by_state(JobState::Pending)?
                + self.queue.count_by_state(JobState::Active)?;
            if outstanding == 0 {
                break;
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        self.dispatcher.shutdown().await;
        tracing::info!("Worker {} idle after {} jobs", self.id, processed);
        Ok(processed)
    }

    async fn execute(&mut self, job: Job) -> Result<(), QueueError> {
        let start = Instant::now();
        tracing::info!(
            "Worker {}: {} job {} for {}",
            self.id,
            job.payload.mode(),
            job.id,
            job.payload.url()
        );

        match self.dispatcher.process(&job).await {
            Ok(dispatch) => match self.queue.complete(&job.id, &dispatch.output) {
                Ok(()) => {
                    tracing::info!(
                        "Job {} completed in {:?} ({} children)",
                        job.id,
                        start.elapsed(),
                        dispatch.children
                    );
                }
                Err(e) => {
                    tracing::error!("Job {}: recording result failed: {}", job.id, e);
                    let reason = JobError::Queue(e).failure_reason();
                    self.record_failure(&job.id, &reason).await?;
                }
            },
            Err(e) => {
                let reason = e.failure_reason();
                tracing::warn!("Job {} failed: {}", job.id, reason);
                self.record_failure(&job.id, &reason).await?;
            }
        }

        Ok(())
    }

    /// Marks a job failed, retrying once after a transport error
    async fn record_failure(&self, id: &str, reason: &str) -> Result<(), QueueError> {
        match self.queue.fail(id, reason) {
            Err(e @ (QueueError::Unavailable(_) | QueueError::Sqlite(_))) => {
                tracing::warn!("Job {}: retrying failure record: {}", id, e);
                tokio::time::sleep(self.poll_interval).await;
                self.queue.fail(id, reason)
            }
            other => other,
        }
    }
}

/// Starts `worker.concurrency` workers on the current runtime
pub fn spawn_workers(
    config: &Config,
    storage: Arc<SqliteStorage>,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    (0..config.worker.concurrency as usize)
        .map(|id| {
            let worker = Worker::from_config(id, config, Arc::clone(&storage));
            tokio::spawn(worker.run(shutdown.clone()))
        })
        .collect()
}
