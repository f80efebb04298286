//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the [`JobQueue`] and
//! [`FrontierStore`] traits. Worker processes pointed at the same database
//! file share one queue and one frontier.

use crate::job::{Job, JobOutput, JobPayload, JobRecord};
use crate::state::JobState;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    EnqueueOptions, EnqueueResult, FrontierError, FrontierResult, FrontierStore, JobQueue,
    QueueError, QueueResult,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const JOB_COLUMNS: &str = "id, payload, state, result, failure_reason, idempotency_key, created_at, finished_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

/// Raw column values of a `jobs` row
struct JobRow {
    id: String,
    payload: String,
    state: String,
    result: Option<String>,
    failure_reason: Option<String>,
    idempotency_key: Option<String>,
    created_at: String,
    finished_at: Option<String>,
}

impl JobRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            payload: row.get(1)?,
            state: row.get(2)?,
            result: row.get(3)?,
            failure_reason: row.get(4)?,
            idempotency_key: row.get(5)?,
            created_at: row.get(6)?,
            finished_at: row.get(7)?,
        })
    }

    fn into_record(self) -> QueueResult<JobRecord> {
        let state = JobState::from_db_string(&self.state).ok_or_else(|| QueueError::Corrupt {
            id: self.id.clone(),
            reason: format!("unknown state '{}'", self.state),
        })?;
        let payload: JobPayload = serde_json::from_str(&self.payload)?;
        let result = self
            .result
            .as_deref()
            .map(serde_json::from_str::<JobOutput>)
            .transpose()?;

        Ok(JobRecord {
            id: self.id,
            payload,
            state,
            result,
            failure_reason: self.failure_reason,
            idempotency_key: self.idempotency_key,
            created_at: self.created_at,
            finished_at: self.finished_at,
        })
    }
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(rusqlite::Error)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;

        // Several worker processes may write to the same file
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database, private to this handle
    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, String> {
        self.conn
            .lock()
            .map_err(|_| "storage connection lock poisoned".to_string())
    }

    fn queue_conn(&self) -> QueueResult<MutexGuard<'_, Connection>> {
        self.lock().map_err(QueueError::Unavailable)
    }

    fn frontier_conn(&self) -> FrontierResult<MutexGuard<'_, Connection>> {
        self.lock().map_err(FrontierError::Unavailable)
    }

    /// Moves an active job to a terminal state or explains why it cannot move
    fn finish(
        &self,
        id: &str,
        to: JobState,
        result: Option<String>,
        failure_reason: Option<&str>,
    ) -> QueueResult<()> {
        let mut conn = self.queue_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<String> = tx
            .query_row("SELECT state FROM jobs WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        let current = current.ok_or_else(|| QueueError::JobNotFound(id.to_string()))?;
        let from = JobState::from_db_string(&current).ok_or_else(|| QueueError::Corrupt {
            id: id.to_string(),
            reason: format!("unknown state '{}'", current),
        })?;

        if !from.can_transition_to(to) {
            return Err(QueueError::InvalidTransition {
                id: id.to_string(),
                from,
                to,
            });
        }

        tx.execute(
            "UPDATE jobs SET state = ?1, result = ?2, failure_reason = ?3, finished_at = ?4
             WHERE id = ?5 AND state = ?6",
            params![
                to.to_db_string(),
                result,
                failure_reason,
                Utc::now().to_rfc3339(),
                id,
                from.to_db_string()
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Inserts a pending job row under a caller-chosen id
    fn insert_job(
        conn: &Connection,
        id: String,
        payload: &JobPayload,
        options: EnqueueOptions,
    ) -> QueueResult<EnqueueResult> {
        let session = payload.crawl_id().unwrap_or_default();
        let body = serde_json::to_string(payload)?;
        let now = Utc::now().to_rfc3339();

        let inserted = conn.execute(
            "INSERT INTO jobs (id, job_type, mode, session, url, idempotency_key, payload, state, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT DO NOTHING",
            params![
                id,
                payload.job_type(),
                payload.mode().as_str(),
                session,
                payload.url(),
                options.idempotency_key,
                body,
                JobState::Pending.to_db_string(),
                now
            ],
        )?;

        if inserted == 1 {
            return Ok(EnqueueResult::Created(id));
        }

        let key = match options.idempotency_key {
            Some(key) => key,
            None => {
                return Err(QueueError::Corrupt {
                    id,
                    reason: "insert ignored without an idempotency key".to_string(),
                })
            }
        };

        let existing: String = conn.query_row(
            "SELECT id FROM jobs WHERE session = ?1 AND idempotency_key = ?2",
            params![session, key],
            |row| row.get(0),
        )?;

        Ok(EnqueueResult::Duplicate(existing))
    }
}

impl JobQueue for SqliteStorage {
    fn enqueue(
        &self,
        payload: &JobPayload,
        options: EnqueueOptions,
    ) -> QueueResult<EnqueueResult> {
        let conn = self.queue_conn()?;
        let id = uuid::Uuid::new_v4().to_string();
        Self::insert_job(&conn, id, payload, options)
    }

    fn get_job(&self, id: &str) -> QueueResult<Option<JobRecord>> {
        let conn = self.queue_conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS),
                params![id],
                JobRow::from_row,
            )
            .optional()?;

        row.map(JobRow::into_record).transpose()
    }

    fn claim_next(&self) -> QueueResult<Option<Job>> {
        let conn = self.queue_conn()?;

        loop {
            let now = Utc::now().to_rfc3339();

            // Single statement, so two workers can never claim the same row
            let claimed: Option<(String, String)> = conn
                .query_row(
                    "UPDATE jobs SET state = ?1, started_at = ?2
                     WHERE seq = (SELECT seq FROM jobs WHERE state = ?3 ORDER BY seq LIMIT 1)
                     RETURNING id, payload",
                    params![
                        JobState::Active.to_db_string(),
                        now,
                        JobState::Pending.to_db_string()
                    ],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let (id, body) = match claimed {
                Some(row) => row,
                None => return Ok(None),
            };

            match serde_json::from_str::<JobPayload>(&body) {
                Ok(payload) => return Ok(Some(Job { id, payload })),
                Err(e) => {
                    // A payload that cannot be decoded can never run: fail it and claim the next one
                    tracing::warn!("Job {} has an undecodable payload: {}", id, e);
                    conn.execute(
                        "UPDATE jobs SET state = ?1, failure_reason = ?2, finished_at = ?3
                         WHERE id = ?4",
                        params![
                            JobState::Failed.to_db_string(),
                            format!("QueueUnavailable: undecodable payload: {}", e),
                            now,
                            id
                        ],
                    )?;
                }
            }
        }
    }

    fn complete(&self, id: &str, output: &JobOutput) -> QueueResult<()> {
        let result = serde_json::to_string(output)?;
        self.finish(id, JobState::Completed, Some(result), None)
    }

    fn fail(&self, id: &str, reason: &str) -> QueueResult<()> {
        self.finish(id, JobState::Failed, None, Some(reason))
    }

    fn count_by_state(&self, state: JobState) -> QueueResult<u64> {
        let conn = self.queue_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE state = ?1",
            params![state.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn session_jobs(&self, crawl_id: &str) -> QueueResult<Vec<JobRecord>> {
        let conn = self.queue_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM jobs WHERE session = ?1 ORDER BY seq ASC",
            JOB_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![crawl_id], JobRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(JobRow::into_record).collect()
    }
}

impl FrontierStore for SqliteStorage {
    fn cardinality(&self, crawl_id: &str) -> FrontierResult<u64> {
        let conn = self.frontier_conn()?;
        let count: Option<i64> = conn
            .query_row(
                "SELECT visit_count FROM frontier_sessions WHERE crawl_id = ?1",
                params![crawl_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0) as u64)
    }

    fn is_member(&self, crawl_id: &str, url: &str) -> FrontierResult<bool> {
        let conn = self.frontier_conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM frontier_visited WHERE crawl_id = ?1 AND url = ?2",
                params![crawl_id, url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn add(&self, crawl_id: &str, url: &str) -> FrontierResult<()> {
        let mut conn = self.frontier_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = Utc::now().to_rfc3339();

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO frontier_visited (crawl_id, url, added_at) VALUES (?1, ?2, ?3)",
            params![crawl_id, url, now],
        )?;

        // The counter only moves when the set grows
        if inserted == 1 {
            tx.execute(
                "INSERT INTO frontier_sessions (crawl_id, visit_count) VALUES (?1, 1)
                 ON CONFLICT(crawl_id) DO UPDATE SET visit_count = visit_count + 1",
                params![crawl_id],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}
