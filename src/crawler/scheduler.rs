//! Depth-bounded crawl task tree
//!
//! Each task owns one page path. It discovers the page's links, claims the
//! ones nobody has seen yet, fetches and saves them as a batch, indexes
//! every saved page, then forks one child task per saved link and joins
//! them in fork order.
//!
//! This module handles:
//! - Deduplication through a per-run visited set (first claim wins)
//! - Skipping paths already persisted for the site
//! - Politeness waits between link-discovery fetches
//! - Cooperative cancellation through the shared [`CrawlPool`]
//! - Recording per-link failures on the site without aborting the run

use crate::crawler::fetcher::{fetch_url, FetchResult};
use crate::crawler::parser::parse_html;
use crate::crawler::pool::CrawlPool;
use crate::indexer::{apply_page, ApplyOutcome};
use crate::lemma::Lemmatizer;
use crate::storage::{lock, NewPage, PageRecord, SharedStorage, Storage, StorageResult};
use crate::url::SiteRoot;
use dashmap::DashSet;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Resources shared by every crawl run of one indexing campaign
#[derive(Clone)]
pub struct CrawlEnv {
    pub storage: SharedStorage,
    pub client: Client,
    pub referrer: Option<String>,
    pub pool: Arc<CrawlPool>,
    pub lemmatizer: Lemmatizer,
    pub max_depth: u32,
    pub politeness_delay: Duration,
}

/// State of one crawl run over one site
pub struct CrawlContext {
    env: CrawlEnv,
    site_id: i64,
    root: SiteRoot,
    visited: DashSet<String>,
}

impl CrawlContext {
    pub fn new(env: CrawlEnv, site_id: i64, root: SiteRoot) -> Self {
        Self {
            env,
            site_id,
            root,
            visited: DashSet::new(),
        }
    }

    pub fn site_id(&self) -> i64 {
        self.site_id
    }

    pub fn root(&self) -> &SiteRoot {
        &self.root
    }

    /// Number of paths claimed so far by this run
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    fn is_cancelled(&self) -> bool {
        self.env.pool.is_shut_down()
    }

    /// Claims a path for this run; false if another task got it first
    fn claim(&self, path: &str) -> bool {
        self.visited.insert(path.to_string())
    }

    /// Fetches one site path while holding a pool slot
    ///
    /// Returns None if the pool was shut down before or during the fetch.
    async fn fetch(&self, path: &str) -> Option<(String, FetchResult)> {
        let url = self.root.page_url(path);
        let _permit = self.env.pool.acquire().await?;

        tracing::debug!("Fetching {}", url);
        let result = self
            .env
            .pool
            .run_cancellable(fetch_url(
                &self.env.client,
                &url,
                self.env.referrer.as_deref(),
            ))
            .await?;

        Some((url, result))
    }

    fn save_pages(&self, pages: &[NewPage]) -> StorageResult<Vec<PageRecord>> {
        let mut storage = lock(&self.env.storage)?;
        storage.insert_pages(self.site_id, pages)
    }

    fn unsaved(&self, paths: &[String]) -> StorageResult<Vec<String>> {
        let existing = {
            let storage = lock(&self.env.storage)?;
            storage.existing_paths(self.site_id, paths)?
        };

        Ok(paths
            .iter()
            .filter(|path| !existing.contains(*path))
            .cloned()
            .collect())
    }

    /// Lemmatizes a saved page and links its lemmas into the index
    fn index(&self, page: &PageRecord) -> StorageResult<ApplyOutcome> {
        let lemmas = self.env.lemmatizer.extract(&page.content);
        let mut storage = lock(&self.env.storage)?;
        apply_page(&mut *storage, self.site_id, page.id, &lemmas)
    }

    fn touch(&self) {
        let result = lock(&self.env.storage).and_then(|mut storage| storage.touch_site(self.site_id));
        if let Err(e) = result {
            tracing::warn!("Failed to refresh heartbeat of site {}: {}", self.site_id, e);
        }
    }

    /// Stores `message` as the site's last error; the run goes on
    fn record_failure(&self, message: &str) {
        tracing::warn!("{}: {}", self.root.as_str(), message);
        let result = lock(&self.env.storage)
            .and_then(|mut storage| storage.record_site_error(self.site_id, message));
        if let Err(e) = result {
            tracing::error!("Failed to record error for site {}: {}", self.site_id, e);
        }
    }

    /// Saves and indexes a batch of fetched pages, returning what was saved
    fn persist(&self, pages: &[NewPage]) -> Vec<PageRecord> {
        if pages.is_empty() {
            return Vec::new();
        }

        let saved = match self.save_pages(pages) {
            Ok(saved) => saved,
            Err(e) => {
                self.record_failure(&format!("Failed to save pages: {}", e));
                return Vec::new();
            }
        };

        for page in &saved {
            match self.index(page) {
                Ok(outcome) => tracing::debug!(
                    "Indexed {} ({} lemmas linked, {} new)",
                    self.root.page_url(&page.path),
                    outcome.linked,
                    outcome.new_lemmas
                ),
                Err(e) => self.record_failure(&format!(
                    "Failed to index {}: {}",
                    self.root.page_url(&page.path),
                    e
                )),
            }
        }

        saved
    }
}

/// A unit of crawl work: one page path at one depth
pub struct CrawlTask {
    ctx: Arc<CrawlContext>,
    path: String,
    depth: u32,
    /// Body already fetched by the parent task
    html: Option<String>,
    single_page: bool,
}

impl CrawlTask {
    /// Root task of a run starting at `path`
    pub fn root(ctx: Arc<CrawlContext>, path: String, single_page: bool) -> Self {
        ctx.claim(&path);
        Self {
            ctx,
            path,
            depth: 0,
            html: None,
            single_page,
        }
    }

    /// Runs this task and all its descendants
    pub fn run(self) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            if self.ctx.is_cancelled() {
                return;
            }

            if self.single_page {
                self.fetch_and_save().await;
                return;
            }

            if self.depth >= self.ctx.env.max_depth {
                return;
            }

            self.expand().await;
        })
    }

    /// Fetches this task's own path, saving and indexing it on success
    async fn fetch_and_save(&self) -> Option<String> {
        let (url, result) = self.ctx.fetch(&self.path).await?;

        match result {
            FetchResult::Success {
                status_code, body, ..
            } => {
                let page = NewPage {
                    path: self.path.clone(),
                    code: status_code,
                    content: body.clone(),
                };
                self.ctx.persist(std::slice::from_ref(&page));
                Some(body)
            }
            FetchResult::NotHtml { content_type } => {
                tracing::info!("Skipping {} ({})", url, content_type);
                None
            }
            failure => {
                if let Some(message) = failure.failure_message(&url) {
                    self.ctx.record_failure(&message);
                }
                None
            }
        }
    }

    async fn expand(mut self) {
        let ctx = Arc::clone(&self.ctx);

        let html = match self.html.take() {
            Some(html) => html,
            None => match self.fetch_and_save().await {
                Some(html) => html,
                None => return,
            },
        };

        ctx.touch();

        let paths = match self.discover(&html) {
            Some(paths) => paths,
            None => return,
        };
        drop(html);

        if paths.is_empty() {
            return;
        }

        if !ctx.env.pool.pause(ctx.env.politeness_delay).await {
            return;
        }

        let mut fetched = Vec::new();
        for path in paths {
            let Some((url, result)) = ctx.fetch(&path).await else {
                return;
            };

            match result {
                FetchResult::Success {
                    status_code, body, ..
                } => fetched.push(NewPage {
                    path,
                    code: status_code,
                    content: body,
                }),
                FetchResult::NotHtml { content_type } => {
                    tracing::debug!("Skipping {} ({})", url, content_type);
                }
                failure => {
                    if let Some(message) = failure.failure_message(&url) {
                        ctx.record_failure(&message);
                    }
                }
            }
        }

        let saved = ctx.persist(&fetched);
        let mut bodies: HashMap<String, String> = fetched
            .into_iter()
            .map(|page| (page.path, page.content))
            .collect();

        let children: Vec<_> = saved
            .iter()
            .map(|page| CrawlTask {
                ctx: Arc::clone(&ctx),
                path: page.path.clone(),
                depth: self.depth + 1,
                html: bodies.remove(&page.path),
                single_page: false,
            })
            .map(|task| tokio::spawn(task.run()))
            .collect();

        tracing::debug!(
            "{} at depth {} forked {} tasks",
            ctx.root.page_url(&self.path),
            self.depth,
            children.len()
        );

        let mut cancelled = false;
        for child in children {
            if !cancelled && ctx.is_cancelled() {
                cancelled = true;
                tracing::debug!(
                    "Crawl cancelled, joining remaining tasks of {}",
                    ctx.root.page_url(&self.path)
                );
            }
            if let Err(e) = child.await {
                tracing::error!("Crawl task panicked: {}", e);
            }
        }
    }

    /// Extracts the links of this page worth fetching, already claimed
    fn discover(&self, html: &str) -> Option<Vec<String>> {
        let base = match Url::parse(&self.ctx.root.page_url(&self.path)) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("Cannot resolve links of {}: {}", self.path, e);
                return None;
            }
        };

        let mut seen = HashSet::new();
        let candidates: Vec<String> = parse_html(html, &base)
            .links
            .iter()
            .filter_map(|link| self.ctx.root.child_path(link))
            .filter(|path| seen.insert(path.clone()))
            .collect();

        let unsaved = match self.ctx.unsaved(&candidates) {
            Ok(unsaved) => unsaved,
            Err(e) => {
                self.ctx
                    .record_failure(&format!("Failed to check known pages: {}", e));
                return None;
            }
        };

        Some(
            unsaved
                .into_iter()
                .filter(|path| self.ctx.claim(path))
                .collect(),
        )
    }
}

/// Crawls a site from `start_path` and returns once every task has finished
pub async fn run_crawl(ctx: Arc<CrawlContext>, start_path: String, single_page: bool) {
    let root = ctx.root.page_url(&start_path);
    tracing::info!(
        "Crawl of {} started (single page: {})",
        root,
        single_page
    );

    CrawlTask::root(Arc::clone(&ctx), start_path, single_page)
        .run()
        .await;

    tracing::info!(
        "Crawl of {} finished, {} paths visited",
        root,
        ctx.visited_count()
    );
}
