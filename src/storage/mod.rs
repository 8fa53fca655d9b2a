//! Storage module for persisting the index
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Site, page, lemma and index row persistence
//! - Atomic per-page transactions for the index maintainer
//! - Aggregate counts for statistics and query thresholds

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::SiteStatus;
use crate::Result;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Store handle shared by crawl tasks and queries
///
/// The lock is taken for one synchronous storage call (or one atomic block)
/// and released before the next `.await`.
pub type SharedStorage = Arc<Mutex<SqliteStorage>>;

/// Opens (creating if needed) the database at `path`
pub fn open_storage(path: &Path) -> Result<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Wraps a storage backend for sharing across tasks
pub fn share(storage: SqliteStorage) -> SharedStorage {
    Arc::new(Mutex::new(storage))
}

/// Locks the shared store, mapping a poisoned lock to a storage error
pub fn lock(storage: &SharedStorage) -> StorageResult<MutexGuard<'_, SqliteStorage>> {
    storage.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Represents a site in the database
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    /// Last status change or heartbeat, epoch milliseconds
    pub status_time: i64,
    pub last_error: Option<String>,
}

/// Represents a fetched page in the database
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub site_id: i64,
    /// Site-relative path, always starting with "/"
    pub path: String,
    pub code: u16,
    pub content: String,
}

/// A page about to be saved
#[derive(Debug, Clone)]
pub struct NewPage {
    pub path: String,
    pub code: u16,
    pub content: String,
}

/// Represents a lemma row; `frequency` counts pages, not occurrences
#[derive(Debug, Clone)]
pub struct LemmaRecord {
    pub id: i64,
    pub site_id: i64,
    pub lemma: String,
    pub frequency: i64,
}

/// Represents a lemma-page link with its occurrence weight
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub id: i64,
    pub lemma_id: i64,
    pub page_id: i64,
    pub rank: f64,
}

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
