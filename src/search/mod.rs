//! Query engine
//!
//! Lemmatizes a query, drops lemmas too common to discriminate, intersects
//! the page sets of the remaining lemmas, ranks the survivors and builds a
//! highlighted snippet for each one.

mod engine;
mod snippet;

pub use engine::SearchEngine;
pub use snippet::build_snippet;

/// One matching page
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Root URL of the owning site
    pub site: String,
    pub site_name: String,
    /// Site-relative page path
    pub uri: String,
    pub title: String,
    /// Body excerpt with query words wrapped in `<b>`
    pub snippet: String,
    /// Score relative to the best match, in (0, 1]
    pub relevance: f64,
}

/// One page of results plus the total number of matches
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResponse {
    pub count: usize,
    pub results: Vec<SearchResult>,
}

/// Cuts the page `offset / limit` of size `limit` out of `results`
///
/// `count` is always the full number of results, also when the offset
/// points past the end.
pub fn paginate(results: Vec<SearchResult>, offset: usize, limit: usize) -> SearchResponse {
    let limit = limit.max(1);
    let start = (offset / limit) * limit;
    let count = results.len();

    SearchResponse {
        count,
        results: results.into_iter().skip(start).take(limit).collect(),
    }
}
