//! Statistics generation from the index database
//!
//! This module provides functionality for extracting and displaying
//! index statistics, both in total and per configured site.

use crate::config::SiteEntry;
use crate::state::SiteStatus;
use crate::storage::Storage;
use crate::url::normalize_root;
use crate::Result;
use chrono::{DateTime, Utc};

/// Totals over the whole index
#[derive(Debug, Clone, PartialEq)]
pub struct TotalStatistics {
    /// Number of configured sites
    pub sites: usize,
    pub pages: u64,
    pub lemmas: u64,
    /// Whether an indexing campaign is active
    pub indexing: bool,
}

/// Statistics of one configured site
#[derive(Debug, Clone, PartialEq)]
pub struct SiteStatistics {
    pub name: String,
    pub url: String,
    pub pages: u64,
    pub lemmas: u64,
    /// None if the site was never indexed
    pub status: Option<SiteStatus>,
    pub error: Option<String>,
    /// Last status change or heartbeat, epoch milliseconds
    pub status_time: Option<i64>,
}

/// Index statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct IndexStatistics {
    pub total: TotalStatistics,
    pub sites: Vec<SiteStatistics>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `sites` - The configured sites, reported in configuration order
/// * `indexing` - Whether an indexing campaign is running
///
/// # Returns
///
/// * `Ok(IndexStatistics)` - Successfully loaded statistics
/// * `Err(LexiError)` - Failed to query statistics
pub fn load_statistics<S: Storage>(
    storage: &S,
    sites: &[SiteEntry],
    indexing: bool,
) -> Result<IndexStatistics> {
    let total = TotalStatistics {
        sites: sites.len(),
        pages: storage.count_pages()?,
        lemmas: storage.count_lemmas()?,
        indexing,
    };

    let mut items = Vec::with_capacity(sites.len());
    for entry in sites {
        let url = normalize_root(&entry.url).unwrap_or_else(|_| entry.url.clone());

        let item = match storage.find_site_by_url(&url)? {
            Some(site) => SiteStatistics {
                name: entry.name.clone(),
                url,
                pages: storage.count_pages_for_site(site.id)?,
                lemmas: storage.count_lemmas_for_site(site.id)?,
                status: Some(site.status),
                error: site.last_error,
                status_time: Some(site.status_time),
            },
            None => SiteStatistics {
                name: entry.name.clone(),
                url,
                pages: 0,
                lemmas: 0,
                status: None,
                error: None,
                status_time: None,
            },
        };
        items.push(item);
    }

    Ok(IndexStatistics { total, sites: items })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &IndexStatistics) {
    println!("=== Index Statistics ===\n");

    println!("Overview:");
    println!("  Sites configured: {}", stats.total.sites);
    println!("  Pages indexed: {}", stats.total.pages);
    println!("  Lemmas: {}", stats.total.lemmas);
    println!(
        "  Indexing: {}",
        if stats.total.indexing { "running" } else { "idle" }
    );
    println!();

    println!("Sites:");
    for site in &stats.sites {
        let status = site
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "NOT INDEXED".to_string());

        println!("  {} ({})", site.name, site.url);
        println!("    Status: {}", status);
        if let Some(time) = site.status_time.and_then(format_millis) {
            println!("    Since: {}", time);
        }
        println!("    Pages: {}, lemmas: {}", site.pages, site.lemmas);
        if let Some(error) = &site.error {
            println!("    Last error: {}", error);
        }
    }
}

fn format_millis(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|time| time.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}
