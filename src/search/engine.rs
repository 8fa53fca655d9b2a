//! Query engine: lemma filtering, page-set intersection and ranking

use crate::config::SearchConfig;
use crate::crawler::extract_title;
use crate::lemma::Lemmatizer;
use crate::search::snippet::build_snippet;
use crate::search::{paginate, SearchResponse, SearchResult};
use crate::storage::{lock, LemmaRecord, PageRecord, SharedStorage, SiteRecord, Storage, StorageResult};
use crate::url::normalize_root;
use crate::{LexiError, Result};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Answers ranked free-text queries against the index
#[derive(Clone)]
pub struct SearchEngine {
    storage: SharedStorage,
    lemmatizer: Lemmatizer,
    config: SearchConfig,
}

/// A candidate page with its raw relevance score
struct Scored {
    page: PageRecord,
    site: SiteRecord,
    score: f64,
}

impl SearchEngine {
    pub fn new(storage: SharedStorage, lemmatizer: Lemmatizer, config: SearchConfig) -> Self {
        Self {
            storage,
            lemmatizer,
            config,
        }
    }

    /// Runs a query and returns one page of ranked results
    ///
    /// # Arguments
    ///
    /// * `query` - Free text; lemmatized the same way as crawled pages
    /// * `site` - Restrict results to the site with this root URL
    /// * `offset` - Selects the result page `offset / limit`
    /// * `limit` - Page size (at least 1)
    ///
    /// # Errors
    ///
    /// * `EmptyQuery` - The query is blank
    pub fn search(
        &self,
        query: &str,
        site: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<SearchResponse> {
        if query.trim().is_empty() {
            return Err(LexiError::EmptyQuery);
        }

        let lemmas = self.lemmatizer.query_lemmas(query);
        tracing::debug!("Query '{}' lemmas: {:?}", query, lemmas);

        let results = self.ranked_results(&lemmas, site)?;
        tracing::debug!("Query '{}' matched {} pages", query, results.len());

        Ok(paginate(results, offset, limit))
    }

    fn ranked_results(&self, lemmas: &[String], site: Option<&str>) -> Result<Vec<SearchResult>> {
        if lemmas.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored = {
            let storage = lock(&self.storage)?;

            let site_id = match site.map(str::trim).filter(|s| !s.is_empty()) {
                None => None,
                Some(url) => match site_filter(&*storage, url)? {
                    Some(site_id) => Some(site_id),
                    None => return Ok(Vec::new()),
                },
            };

            let candidates = self.candidate_lemmas(&*storage, lemmas, site_id)?;
            let page_ids = intersect_pages(&*storage, &candidates)?;
            if page_ids.is_empty() {
                return Ok(Vec::new());
            }

            score_pages(&*storage, &page_ids)?
        };

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.page.id.cmp(&b.page.id))
        });

        let max = scored.first().map(|s| s.score).unwrap_or(0.0);

        let results = scored
            .into_iter()
            .filter_map(|candidate| {
                let snippet =
                    build_snippet(&candidate.page.content, lemmas, self.config.snippet_radius)?;
                Some(SearchResult {
                    site: candidate.site.url,
                    site_name: candidate.site.name,
                    uri: candidate.page.path,
                    title: extract_title(&candidate.page.content).unwrap_or_default(),
                    snippet,
                    relevance: if max > 0.0 { candidate.score / max } else { 0.0 },
                })
            })
            .collect();

        Ok(results)
    }

    /// Lemma rows matching the query, minus overly common ones, rarest first
    fn candidate_lemmas<S: Storage>(
        &self,
        storage: &S,
        lemmas: &[String],
        site_id: Option<i64>,
    ) -> StorageResult<Vec<LemmaRecord>> {
        let total_pages = storage.count_pages()?;
        let ceiling = self.config.frequency_threshold * total_pages as f64;

        let mut candidates = Vec::new();
        for lemma in lemmas {
            for record in storage.lemmas_by_text(lemma)? {
                if site_id.map_or(false, |id| record.site_id != id) {
                    continue;
                }
                if record.frequency as f64 > ceiling {
                    tracing::debug!(
                        "Ignoring lemma '{}' on site {}: on {} of {} pages",
                        record.lemma,
                        record.site_id,
                        record.frequency,
                        total_pages
                    );
                    continue;
                }
                candidates.push(record);
            }
        }

        candidates.sort_by_key(|record| record.frequency);
        Ok(candidates)
    }
}

/// Id of the stored site whose root is `url`, if any
fn site_filter<S: Storage>(storage: &S, url: &str) -> StorageResult<Option<i64>> {
    let Ok(root) = normalize_root(url) else {
        tracing::debug!("Site filter '{}' is not a valid root", url);
        return Ok(None);
    };
    Ok(storage.find_site_by_url(&root)?.map(|site| site.id))
}

/// Pages linked to every lemma text among `candidates`
///
/// Candidates are grouped by text in ascending frequency order; the running
/// intersection stops as soon as it is empty.
fn intersect_pages<S: Storage>(
    storage: &S,
    candidates: &[LemmaRecord],
) -> StorageResult<Vec<i64>> {
    let mut groups: Vec<(&str, Vec<i64>)> = Vec::new();
    for record in candidates {
        match groups.iter_mut().find(|(text, _)| *text == record.lemma) {
            Some((_, ids)) => ids.push(record.id),
            None => groups.push((record.lemma.as_str(), vec![record.id])),
        }
    }

    let mut common: Option<HashSet<i64>> = None;
    for (_, lemma_ids) in groups {
        let mut pages = HashSet::new();
        for lemma_id in lemma_ids {
            pages.extend(storage.index_for_lemma(lemma_id)?.into_iter().map(|row| row.page_id));
        }

        let narrowed = match common {
            None => pages,
            Some(current) => current.intersection(&pages).copied().collect(),
        };
        if narrowed.is_empty() {
            return Ok(Vec::new());
        }
        common = Some(narrowed);
    }

    let mut page_ids: Vec<i64> = common.unwrap_or_default().into_iter().collect();
    page_ids.sort_unstable();
    Ok(page_ids)
}

/// Raw relevance of each page: the sum of all its index ranks
fn score_pages<S: Storage>(storage: &S, page_ids: &[i64]) -> StorageResult<Vec<Scored>> {
    let mut sites: HashMap<i64, SiteRecord> = HashMap::new();
    let mut scored = Vec::with_capacity(page_ids.len());

    for page in storage.pages_by_ids(page_ids)? {
        let site = match sites.get(&page.site_id) {
            Some(site) => site.clone(),
            None => {
                let site = storage.get_site(page.site_id)?;
                sites.insert(page.site_id, site.clone());
                site
            }
        };
        let score = storage.rank_sum(page.id)?;
        scored.push(Scored { page, site, score });
    }

    Ok(scored)
}
