//! Output module for reporting on the index
//!
//! This module handles:
//! - Aggregating index statistics in total and per configured site
//! - Printing statistics and search results for the command line

pub mod stats;

pub use stats::{load_statistics, print_statistics, IndexStatistics, SiteStatistics, TotalStatistics};

use crate::search::SearchResponse;

/// Prints a page of search results to stdout
pub fn print_search_results(query: &str, response: &SearchResponse) {
    println!(
        "=== {} results for \"{}\" (showing {}) ===\n",
        response.count,
        query,
        response.results.len()
    );

    for result in &response.results {
        let title = if result.title.is_empty() {
            result.uri.as_str()
        } else {
            result.title.as_str()
        };

        println!("{:.3}  {}", result.relevance, title);
        println!("       {}{} ({})", result.site, result.uri, result.site_name);
        println!("       {}", result.snippet);
        println!();
    }
}
