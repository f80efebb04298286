//! Storage module for the job queue transport and the frontier store
//!
//! This module handles all database operations shared between workers:
//! - SQLite database initialization and schema management
//! - Job enqueueing with idempotency keys, claiming and terminal transitions
//! - Session-scoped visited sets and visit counts

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{
    EnqueueOptions, EnqueueResult, FrontierError, FrontierResult, FrontierStore, JobQueue,
    QueueError, QueueResult,
};

use crate::GhostError;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(GhostError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, GhostError> {
    Ok(SqliteStorage::new(path)?)
}
