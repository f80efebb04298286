//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Ghostcrawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Job queue
CREATE TABLE IF NOT EXISTS jobs (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    job_type TEXT NOT NULL,
    mode TEXT NOT NULL,
    session TEXT NOT NULL DEFAULT '',
    url TEXT NOT NULL,
    idempotency_key TEXT,
    payload TEXT NOT NULL,
    state TEXT NOT NULL,
    result TEXT,
    failure_reason TEXT,
    created_at TEXT NOT NULL,
    started_at TEXT,
    finished_at TEXT,
    UNIQUE(session, idempotency_key)
);

CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state, seq);
CREATE INDEX IF NOT EXISTS idx_jobs_session ON jobs(session);

-- Visited URLs per crawl session
CREATE TABLE IF NOT EXISTS frontier_visited (
    crawl_id TEXT NOT NULL,
    url TEXT NOT NULL,
    added_at TEXT NOT NULL,
    PRIMARY KEY (crawl_id, url)
);

-- Visit counters per crawl session
CREATE TABLE IF NOT EXISTS frontier_sessions (
    crawl_id TEXT PRIMARY KEY,
    visit_count INTEGER NOT NULL DEFAULT 0
);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
