//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::SiteStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{now_millis, IndexRecord, LemmaRecord, NewPage, PageRecord, SiteRecord};
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

/// Maximum number of bound parameters used for one `IN (...)` list
const IN_CHUNK: usize = 500;

const SITE_COLUMNS: &str = "id, url, name, status, status_time, last_error";
const PAGE_COLUMNS: &str = "id, site_id, path, code, content";
const LEMMA_COLUMNS: &str = "id, site_id, lemma, frequency";
const INDEX_COLUMNS: &str = "id, lemma_id, page_id, rank";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(LexiError)` - Failed to open database
    pub fn new(path: &Path) -> crate::Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> crate::Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count(&self, sql: &str, params: impl rusqlite::Params) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, params, |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn expect_changed(changed: usize, entity: &'static str, id: i64) -> StorageResult<()> {
        if changed == 0 {
            Err(StorageError::not_found(entity, id))
        } else {
            Ok(())
        }
    }
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    Ok(SiteRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        status: SiteStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(SiteStatus::Failed),
        status_time: row.get(4)?,
        last_error: row.get(5)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        content: row.get(4)?,
    })
}

fn lemma_from_row(row: &Row<'_>) -> rusqlite::Result<LemmaRecord> {
    Ok(LemmaRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        lemma: row.get(2)?,
        frequency: row.get(3)?,
    })
}

fn index_from_row(row: &Row<'_>) -> rusqlite::Result<IndexRecord> {
    Ok(IndexRecord {
        id: row.get(0)?,
        lemma_id: row.get(1)?,
        page_id: row.get(2)?,
        rank: row.get(3)?,
    })
}

/// Maps UNIQUE/CHECK failures to `StorageError::Constraint`
fn map_constraint(err: rusqlite::Error) -> StorageError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, ref msg) if e.code == ErrorCode::ConstraintViolation => {
            StorageError::Constraint(msg.clone().unwrap_or_else(|| e.to_string()))
        }
        other => StorageError::Sqlite(other),
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl Storage for SqliteStorage {
    // ===== Transactions =====

    fn atomically<T, F>(&mut self, f: F) -> StorageResult<T>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> StorageResult<T>,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        match f(self) {
            Ok(value) => {
                if let Err(e) = self.conn.execute_batch("COMMIT") {
                    let _ = self.conn.execute_batch("ROLLBACK");
                    return Err(e.into());
                }
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::warn!("Rollback failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    // ===== Site Management =====

    fn create_site(&mut self, url: &str, name: &str) -> StorageResult<i64> {
        self.conn
            .execute(
                "INSERT INTO site (url, name, status, status_time) VALUES (?1, ?2, ?3, ?4)",
                params![url, name, SiteStatus::Indexing.to_db_string(), now_millis()],
            )
            .map_err(map_constraint)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let sql = format!("SELECT {} FROM site WHERE url = ?1", SITE_COLUMNS);
        let site = self
            .conn
            .query_row(&sql, params![url], site_from_row)
            .optional()?;
        Ok(site)
    }

    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord> {
        let sql = format!("SELECT {} FROM site WHERE id = ?1", SITE_COLUMNS);
        self.conn
            .query_row(&sql, params![site_id], site_from_row)
            .optional()?
            .ok_or_else(|| StorageError::not_found("Site", site_id))
    }

    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let sql = format!("SELECT {} FROM site ORDER BY id", SITE_COLUMNS);
        let mut stmt = self.conn.prepare(&sql)?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn update_site_status(&mut self, site_id: i64, status: SiteStatus) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE site SET status = ?1, status_time = MAX(status_time, ?2) WHERE id = ?3",
            params![status.to_db_string(), now_millis(), site_id],
        )?;
        Self::expect_changed(changed, "Site", site_id)
    }

    fn touch_site(&mut self, site_id: i64) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE site SET status_time = MAX(status_time, ?1) WHERE id = ?2",
            params![now_millis(), site_id],
        )?;
        Self::expect_changed(changed, "Site", site_id)
    }

    fn record_site_error(&mut self, site_id: i64, error: &str) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE site SET status = ?1, last_error = ?2, status_time = MAX(status_time, ?3)
             WHERE id = ?4",
            params![SiteStatus::Failed.to_db_string(), error, now_millis(), site_id],
        )?;
        Self::expect_changed(changed, "Site", site_id)
    }

    fn delete_site(&mut self, site_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM site WHERE id = ?1", params![site_id])
            .map_err(map_constraint)?;
        Ok(())
    }

    // ===== Page Management =====

    fn insert_pages(&mut self, site_id: i64, pages: &[NewPage]) -> StorageResult<Vec<PageRecord>> {
        self.atomically(|storage| {
            let mut stmt = storage.conn.prepare_cached(
                "INSERT INTO page (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(site_id, path) DO NOTHING",
            )?;

            let mut saved = Vec::with_capacity(pages.len());
            for page in pages {
                let inserted =
                    stmt.execute(params![site_id, page.path, page.code, page.content])?;
                if inserted == 1 {
                    saved.push(PageRecord {
                        id: storage.conn.last_insert_rowid(),
                        site_id,
                        path: page.path.clone(),
                        code: page.code,
                        content: page.content.clone(),
                    });
                }
            }
            Ok(saved)
        })
    }

    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>> {
        let sql = format!(
            "SELECT {} FROM page WHERE site_id = ?1 AND path = ?2",
            PAGE_COLUMNS
        );
        let page = self
            .conn
            .query_row(&sql, params![site_id, path], page_from_row)
            .optional()?;
        Ok(page)
    }

    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord> {
        let sql = format!("SELECT {} FROM page WHERE id = ?1", PAGE_COLUMNS);
        self.conn
            .query_row(&sql, params![page_id], page_from_row)
            .optional()?
            .ok_or_else(|| StorageError::not_found("Page", page_id))
    }

    fn pages_by_ids(&self, page_ids: &[i64]) -> StorageResult<Vec<PageRecord>> {
        let mut pages = Vec::with_capacity(page_ids.len());
        for chunk in page_ids.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT {} FROM page WHERE id IN ({})",
                PAGE_COLUMNS,
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), page_from_row)?;
            for row in rows {
                pages.push(row?);
            }
        }
        Ok(pages)
    }

    fn existing_paths(&self, site_id: i64, paths: &[String]) -> StorageResult<HashSet<String>> {
        let mut existing = HashSet::new();
        for chunk in paths.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT path FROM page WHERE site_id = ? AND path IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;

            let mut bound: Vec<rusqlite::types::Value> = Vec::with_capacity(chunk.len() + 1);
            bound.push(site_id.into());
            bound.extend(chunk.iter().map(|p| p.clone().into()));

            let rows = stmt.query_map(params_from_iter(bound.iter()), |row| {
                row.get::<_, String>(0)
            })?;
            for row in rows {
                existing.insert(row?);
            }
        }
        Ok(existing)
    }

    fn page_ids_for_site(&self, site_id: i64) -> StorageResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM page WHERE site_id = ?1 ORDER BY id")?;
        let ids = stmt
            .query_map(params![site_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn delete_page(&mut self, page_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM page WHERE id = ?1", params![page_id])
            .map_err(map_constraint)?;
        Ok(())
    }

    fn count_pages(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM page", params![])
    }

    fn count_pages_for_site(&self, site_id: i64) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM page WHERE site_id = ?1",
            params![site_id],
        )
    }

    // ===== Lemma Management =====

    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>> {
        let sql = format!(
            "SELECT {} FROM lemma WHERE site_id = ?1 AND lemma = ?2",
            LEMMA_COLUMNS
        );
        let found = self
            .conn
            .query_row(&sql, params![site_id, lemma], lemma_from_row)
            .optional()?;
        Ok(found)
    }

    fn insert_lemma(&mut self, site_id: i64, lemma: &str) -> StorageResult<i64> {
        self.conn
            .execute(
                "INSERT INTO lemma (site_id, lemma, frequency) VALUES (?1, ?2, 1)",
                params![site_id, lemma],
            )
            .map_err(map_constraint)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn increment_frequency(&mut self, lemma_id: i64) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE lemma SET frequency = frequency + 1 WHERE id = ?1",
            params![lemma_id],
        )?;
        Self::expect_changed(changed, "Lemma", lemma_id)
    }

    fn decrement_frequency(&mut self, lemma_id: i64) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE lemma SET frequency = frequency - 1 WHERE id = ?1",
            params![lemma_id],
        )?;
        Self::expect_changed(changed, "Lemma", lemma_id)
    }

    fn lemmas_by_text(&self, lemma: &str) -> StorageResult<Vec<LemmaRecord>> {
        let sql = format!(
            "SELECT {} FROM lemma WHERE lemma = ?1 ORDER BY id",
            LEMMA_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let lemmas = stmt
            .query_map(params![lemma], lemma_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lemmas)
    }

    fn purge_unused_lemmas(&mut self) -> StorageResult<usize> {
        let purged = self
            .conn
            .execute("DELETE FROM lemma WHERE frequency <= 0", [])
            .map_err(map_constraint)?;
        Ok(purged)
    }

    fn delete_lemmas_for_site(&mut self, site_id: i64) -> StorageResult<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM lemma WHERE site_id = ?1", params![site_id])
            .map_err(map_constraint)?;
        Ok(deleted)
    }

    fn count_lemmas(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM lemma", params![])
    }

    fn count_lemmas_for_site(&self, site_id: i64) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM lemma WHERE site_id = ?1",
            params![site_id],
        )
    }

    // ===== Index Management =====

    fn find_index(&self, lemma_id: i64, page_id: i64) -> StorageResult<Option<IndexRecord>> {
        let sql = format!(
            "SELECT {} FROM search_index WHERE lemma_id = ?1 AND page_id = ?2",
            INDEX_COLUMNS
        );
        let found = self
            .conn
            .query_row(&sql, params![lemma_id, page_id], index_from_row)
            .optional()?;
        Ok(found)
    }

    fn insert_index(&mut self, lemma_id: i64, page_id: i64, rank: f64) -> StorageResult<i64> {
        self.conn
            .execute(
                "INSERT INTO search_index (lemma_id, page_id, rank) VALUES (?1, ?2, ?3)",
                params![lemma_id, page_id, rank],
            )
            .map_err(map_constraint)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn index_for_page(&self, page_id: i64) -> StorageResult<Vec<IndexRecord>> {
        let sql = format!(
            "SELECT {} FROM search_index WHERE page_id = ?1 ORDER BY id",
            INDEX_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![page_id], index_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn index_for_lemma(&self, lemma_id: i64) -> StorageResult<Vec<IndexRecord>> {
        let sql = format!(
            "SELECT {} FROM search_index WHERE lemma_id = ?1 ORDER BY id",
            INDEX_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![lemma_id], index_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn delete_index_for_page(&mut self, page_id: i64) -> StorageResult<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM search_index WHERE page_id = ?1", params![page_id])?;
        Ok(deleted)
    }

    fn rank_sum(&self, page_id: i64) -> StorageResult<f64> {
        let sum: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(rank), 0.0) FROM search_index WHERE page_id = ?1",
            params![page_id],
            |row| row.get(0),
        )?;
        Ok(sum)
    }
}
