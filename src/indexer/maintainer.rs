//! Index maintenance: applies lemma counts to the store and reverses them
//!
//! Every per-page operation runs in one transaction, so the lemma
//! frequencies always match the number of live index rows. Site-wide
//! removal is a sequence of per-page transactions to keep lock scope small
//! while other sites are still being crawled.

use crate::storage::{lock, SharedStorage, Storage, StorageError, StorageResult};
use std::collections::HashMap;

/// Outcome of applying one page's lemmas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Lemma rows created for the site
    pub new_lemmas: usize,
    /// Index rows created (one per lemma newly linked to the page)
    pub linked: usize,
    /// Lemmas already linked to the page, left untouched
    pub unchanged: usize,
}

/// Links every lemma of a page into the index
///
/// For each (lemma, count):
/// - a lemma unseen on the site is created with frequency 1 and linked
///   with rank = count
/// - a known lemma not yet linked to this page gains one frequency and a
///   link with rank = count
/// - a lemma already linked to this page is left as is, rank included
pub fn apply_page<S: Storage>(
    storage: &mut S,
    site_id: i64,
    page_id: i64,
    lemmas: &HashMap<String, usize>,
) -> StorageResult<ApplyOutcome> {
    let mut entries: Vec<(&String, &usize)> = lemmas.iter().collect();
    entries.sort();

    storage.atomically(|storage| {
        let mut outcome = ApplyOutcome::default();

        for (lemma, count) in entries {
            let rank = *count as f64;

            match storage.find_lemma(site_id, lemma)? {
                None => {
                    let lemma_id = storage.insert_lemma(site_id, lemma)?;
                    storage.insert_index(lemma_id, page_id, rank)?;
                    outcome.new_lemmas += 1;
                    outcome.linked += 1;
                }
                Some(existing) => {
                    if storage.find_index(existing.id, page_id)?.is_some() {
                        tracing::trace!("Lemma '{}' already linked to page {}", lemma, page_id);
                        outcome.unchanged += 1;
                        continue;
                    }
                    storage.increment_frequency(existing.id)?;
                    storage.insert_index(existing.id, page_id, rank)?;
                    outcome.linked += 1;
                }
            }
        }

        Ok(outcome)
    })
}

/// Removes a page and everything the index holds about it
///
/// Decrements each linked lemma, deletes the links and the page, then
/// purges lemmas no page contains any more. Returns false if the page
/// does not exist.
pub fn remove_page<S: Storage>(storage: &mut S, page_id: i64) -> StorageResult<bool> {
    storage.atomically(|storage| {
        match storage.get_page(page_id) {
            Ok(_) => {}
            Err(StorageError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        }

        let links = storage.index_for_page(page_id)?;
        for link in &links {
            storage.decrement_frequency(link.lemma_id)?;
        }

        storage.delete_index_for_page(page_id)?;
        storage.delete_page(page_id)?;
        let purged = storage.purge_unused_lemmas()?;

        tracing::debug!(
            "Removed page {} ({} links, {} lemmas purged)",
            page_id,
            links.len(),
            purged
        );
        Ok(true)
    })
}

/// Removes the page stored under `path` for a site, if any
pub fn remove_page_by_path<S: Storage>(
    storage: &mut S,
    site_id: i64,
    path: &str,
) -> StorageResult<bool> {
    match storage.find_page(site_id, path)? {
        Some(page) => remove_page(storage, page.id),
        None => Ok(false),
    }
}

/// Removes a site with all its pages, lemmas and links
///
/// The shared store is locked once per page, so crawls of other sites
/// keep running while a large site is dropped. Returns false if no site
/// has this URL.
pub fn remove_site(storage: &SharedStorage, url: &str) -> StorageResult<bool> {
    let (site_id, page_ids) = {
        let storage = lock(storage)?;
        let Some(site) = storage.find_site_by_url(url)? else {
            return Ok(false);
        };
        (site.id, storage.page_ids_for_site(site.id)?)
    };

    for page_id in &page_ids {
        remove_page(&mut *lock(storage)?, *page_id)?;
    }

    lock(storage)?.atomically(|storage| {
        storage.delete_lemmas_for_site(site_id)?;
        storage.delete_site(site_id)
    })?;

    tracing::info!("Removed site {} ({} pages)", url, page_ids.len());
    Ok(true)
}
