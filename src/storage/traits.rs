//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::state::SiteStatus;
use crate::storage::{IndexRecord, LemmaRecord, NewPage, PageRecord, SiteRecord};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Writes take `&mut self`; callers sharing a backend across tasks wrap it
/// in a mutex. Frequency changes are single arithmetic updates inside the
/// store, never read-modify-write in the caller.
pub trait Storage {
    // ===== Transactions =====

    /// Runs `f` inside one transaction, rolling back if it fails
    ///
    /// Called while a transaction is already open, `f` joins it.
    fn atomically<T, F>(&mut self, f: F) -> StorageResult<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> StorageResult<T>;

    // ===== Site Management =====

    /// Creates a site in INDEXING status and returns its ID
    fn create_site(&mut self, url: &str, name: &str) -> StorageResult<i64>;

    /// Finds a site by its root URL
    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    /// Gets a site by ID
    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord>;

    /// Lists all sites ordered by ID
    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    /// Sets the status of a site and advances its status time
    fn update_site_status(&mut self, site_id: i64, status: SiteStatus) -> StorageResult<()>;

    /// Advances the status time without changing the status (heartbeat)
    fn touch_site(&mut self, site_id: i64) -> StorageResult<()>;

    /// Marks a site FAILED with an error message
    fn record_site_error(&mut self, site_id: i64, error: &str) -> StorageResult<()>;

    /// Deletes a site row; its pages and lemmas must already be gone
    fn delete_site(&mut self, site_id: i64) -> StorageResult<()>;

    // ===== Page Management =====

    /// Saves a batch of pages for a site
    ///
    /// Paths that already exist for the site are skipped. Returns the
    /// records actually inserted, in input order.
    fn insert_pages(&mut self, site_id: i64, pages: &[NewPage]) -> StorageResult<Vec<PageRecord>>;

    /// Finds a page by (site, path)
    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>>;

    /// Gets a page by ID
    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord>;

    /// Gets pages by ID; unknown IDs are skipped
    fn pages_by_ids(&self, page_ids: &[i64]) -> StorageResult<Vec<PageRecord>>;

    /// Returns which of `paths` are already saved for the site
    fn existing_paths(&self, site_id: i64, paths: &[String]) -> StorageResult<HashSet<String>>;

    /// IDs of every page of a site
    fn page_ids_for_site(&self, site_id: i64) -> StorageResult<Vec<i64>>;

    /// Deletes a page row; its index rows must already be gone
    fn delete_page(&mut self, page_id: i64) -> StorageResult<()>;

    /// Total number of pages across all sites
    fn count_pages(&self) -> StorageResult<u64>;

    /// Number of pages of one site
    fn count_pages_for_site(&self, site_id: i64) -> StorageResult<u64>;

    // ===== Lemma Management =====

    /// Finds the lemma row for (site, lemma)
    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>>;

    /// Creates a lemma row with frequency 1 and returns its ID
    fn insert_lemma(&mut self, site_id: i64, lemma: &str) -> StorageResult<i64>;

    /// Atomically adds one to a lemma's frequency
    fn increment_frequency(&mut self, lemma_id: i64) -> StorageResult<()>;

    /// Atomically subtracts one from a lemma's frequency
    fn decrement_frequency(&mut self, lemma_id: i64) -> StorageResult<()>;

    /// All lemma rows with this text, across sites
    fn lemmas_by_text(&self, lemma: &str) -> StorageResult<Vec<LemmaRecord>>;

    /// Deletes every lemma with frequency <= 0, returning how many
    fn purge_unused_lemmas(&mut self) -> StorageResult<usize>;

    /// Deletes every lemma of a site; its index rows must already be gone
    fn delete_lemmas_for_site(&mut self, site_id: i64) -> StorageResult<usize>;

    /// Total number of lemma rows across all sites
    fn count_lemmas(&self) -> StorageResult<u64>;

    /// Number of lemma rows of one site
    fn count_lemmas_for_site(&self, site_id: i64) -> StorageResult<u64>;

    // ===== Index Management =====

    /// Finds the index row for (lemma, page)
    fn find_index(&self, lemma_id: i64, page_id: i64) -> StorageResult<Option<IndexRecord>>;

    /// Creates an index row
    fn insert_index(&mut self, lemma_id: i64, page_id: i64, rank: f64) -> StorageResult<i64>;

    /// All index rows of a page
    fn index_for_page(&self, page_id: i64) -> StorageResult<Vec<IndexRecord>>;

    /// All index rows of a lemma
    fn index_for_lemma(&self, lemma_id: i64) -> StorageResult<Vec<IndexRecord>>;

    /// Deletes every index row of a page
    fn delete_index_for_page(&mut self, page_id: i64) -> StorageResult<usize>;

    /// Sum of the ranks of every index row on a page
    fn rank_sum(&self, page_id: i64) -> StorageResult<f64>;
}
