//! Crawler coordinator - indexing campaign orchestration
//!
//! This module owns the process-wide indexing state and drives crawl runs:
//! - Starting one crawl run per configured site on a shared worker pool
//! - Replacing any earlier data of a site before it is crawled again
//! - Promoting sites to INDEXED when their run ends cleanly
//! - Stopping every run and marking unfinished sites FAILED
//! - Re-indexing a single page of a configured site

use crate::config::{Config, SiteEntry};
use crate::crawler::fetcher::build_http_client;
use crate::crawler::pool::CrawlPool;
use crate::crawler::scheduler::{run_crawl, CrawlContext, CrawlEnv};
use crate::indexer::{remove_page_by_path, remove_site};
use crate::lemma::Lemmatizer;
use crate::state::{RunState, SiteStatus};
use crate::storage::{lock, open_storage, share, SharedStorage, Storage, StorageResult};
use crate::url::{resolve_site, SiteRoot};
use crate::{LexiError, Result};
use reqwest::Client;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Error stored on every site left unfinished by a stop request
pub const STOPPED_MESSAGE: &str = "Indexing stopped by operator";

/// Main crawler coordinator structure
///
/// One coordinator serves the whole process. Starting, stopping and
/// single-page re-indexing all go through the same [`RunState`], so at
/// most one campaign is ever active.
pub struct Coordinator {
    config: Arc<Config>,
    storage: SharedStorage,
    client: Client,
    lemmatizer: Lemmatizer,
    run_state: Arc<RunState>,
    pool: Mutex<Arc<CrawlPool>>,
}

impl Coordinator {
    /// Creates a coordinator over an already opened store
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `storage` - The shared index store
    /// * `lemmatizer` - Lemmatizer used for every crawled page
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to start indexing
    /// * `Err(LexiError)` - The HTTP client could not be built
    pub fn new(config: Config, storage: SharedStorage, lemmatizer: Lemmatizer) -> Result<Self> {
        let client = build_http_client(&config.user_agent, &config.crawler)?;
        let pool = CrawlPool::new(config.crawler.max_concurrent_tasks as usize);

        Ok(Self {
            config: Arc::new(config),
            storage,
            client,
            lemmatizer,
            run_state: Arc::new(RunState::new()),
            pool: Mutex::new(Arc::new(pool)),
        })
    }

    /// Opens the configured database and creates a coordinator with the
    /// Russian lemmatizer
    pub fn open(config: Config) -> Result<Self> {
        let storage = open_storage(Path::new(&config.storage.database_path))?;
        Self::new(config, share(storage), Lemmatizer::russian())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to the index store, shared with the query engine
    pub fn storage(&self) -> SharedStorage {
        Arc::clone(&self.storage)
    }

    pub fn lemmatizer(&self) -> &Lemmatizer {
        &self.lemmatizer
    }

    /// Returns true while any crawl run is active or a stop is in progress
    pub fn is_indexing(&self) -> bool {
        self.run_state.is_running()
    }

    /// Starts one crawl run per configured site
    ///
    /// Returns once the runs are launched. Each run first replaces the
    /// site's earlier data with a fresh INDEXING site record.
    ///
    /// # Errors
    ///
    /// * `AlreadyRunning` - A campaign is active or being stopped
    pub fn start_indexing(&self) -> Result<()> {
        let sites = self.config.sites.clone();
        let generation = self.run_state.begin(sites.len())?;

        if sites.is_empty() {
            tracing::warn!("No sites configured, nothing to index");
            return Ok(());
        }

        let pool = self.active_pool();
        tracing::info!(
            "Indexing {} sites with {} workers",
            sites.len(),
            pool.size()
        );

        for site in sites {
            let env = self.env(Arc::clone(&pool));
            let run_state = Arc::clone(&self.run_state);

            tokio::spawn(async move {
                crawl_site(env, site).await;
                run_state.finish(generation);
            });
        }

        Ok(())
    }

    /// Stops every crawl run and marks unfinished sites FAILED
    ///
    /// # Errors
    ///
    /// * `NotRunning` - No campaign is active
    pub fn stop_indexing(&self) -> Result<()> {
        self.run_state.request_stop()?;
        tracing::info!("Stopping indexing");

        self.current_pool().shutdown();
        let result = fail_unfinished_sites(&self.storage);
        self.run_state.stopped();

        let failed = result?;
        tracing::info!("Indexing stopped, {} sites marked failed", failed);
        Ok(())
    }

    /// Re-indexes exactly one page of a configured site
    ///
    /// The URL is matched to the configured site with the longest matching
    /// root. The site record is created if it does not exist yet. Any
    /// stored copy of the page is removed from the index before the page
    /// is fetched again.
    ///
    /// # Errors
    ///
    /// * `OutOfScope` - The URL is not under any configured site
    /// * `AlreadyRunning` - A stop is in progress
    pub async fn index_page(&self, url: &str) -> Result<()> {
        let (entry, root, path) =
            resolve_site(url, &self.config.sites).ok_or_else(|| LexiError::OutOfScope {
                url: url.to_string(),
            })?;

        let generation = self.run_state.join()?;
        let result = self.reindex(entry, root, path).await;
        self.run_state.finish(generation);
        result
    }

    /// Waits until no crawl run is active
    pub async fn wait_until_idle(&self) {
        self.run_state.wait_until_idle().await;
    }

    async fn reindex(&self, entry: &SiteEntry, root: SiteRoot, path: String) -> Result<()> {
        let site_id = {
            let mut storage = lock(&self.storage)?;
            let site_id = match storage.find_site_by_url(root.as_str())? {
                Some(site) => site.id,
                None => storage.create_site(root.as_str(), &entry.name)?,
            };
            remove_page_by_path(&mut *storage, site_id, &path)?;
            storage.update_site_status(site_id, SiteStatus::Indexing)?;
            site_id
        };

        tracing::info!("Re-indexing {}", root.page_url(&path));

        let pool = self.active_pool();
        let ctx = Arc::new(CrawlContext::new(self.env(Arc::clone(&pool)), site_id, root));
        run_crawl(ctx, path, true).await;

        if !pool.is_shut_down() {
            complete_site(&self.storage, site_id)?;
        }
        Ok(())
    }

    fn env(&self, pool: Arc<CrawlPool>) -> CrawlEnv {
        CrawlEnv {
            storage: Arc::clone(&self.storage),
            client: self.client.clone(),
            referrer: self.config.user_agent.referrer.clone(),
            pool,
            lemmatizer: self.lemmatizer.clone(),
            max_depth: self.config.crawler.max_depth,
            politeness_delay: self.config.crawler.politeness_delay(),
        }
    }

    fn current_pool(&self) -> Arc<CrawlPool> {
        let pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*pool)
    }

    /// The pool for new work, replacing it if a stop shut it down
    fn active_pool(&self) -> Arc<CrawlPool> {
        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        if pool.is_shut_down() {
            let size = pool.size();
            *pool = Arc::new(CrawlPool::new(size));
        }
        Arc::clone(&*pool)
    }
}

/// Replaces a site's stored data and crawls it from its root
async fn crawl_site(env: CrawlEnv, site: SiteEntry) {
    let root = match SiteRoot::parse(&site.url) {
        Ok(root) => root,
        Err(e) => {
            tracing::error!("Skipping site {}: {}", site.url, e);
            return;
        }
    };

    let site_id = match recreate_site(&env.storage, &root, &site.name) {
        Ok(site_id) => site_id,
        Err(e) => {
            tracing::error!("Failed to prepare site {}: {}", root.as_str(), e);
            return;
        }
    };

    let pool = Arc::clone(&env.pool);
    if pool.is_shut_down() {
        // Stopped while the old data was being removed
        let marked = lock(&env.storage)
            .and_then(|mut storage| storage.record_site_error(site_id, STOPPED_MESSAGE));
        if let Err(e) = marked {
            tracing::error!("Failed to mark site {} failed: {}", root.as_str(), e);
        }
        return;
    }

    let storage = Arc::clone(&env.storage);
    let ctx = Arc::new(CrawlContext::new(env, site_id, root.clone()));
    run_crawl(ctx, "/".to_string(), false).await;

    if pool.is_shut_down() {
        return;
    }

    match complete_site(&storage, site_id) {
        Ok(status) => tracing::info!("Site {} finished as {}", root.as_str(), status),
        Err(e) => tracing::error!("Failed to complete site {}: {}", root.as_str(), e),
    }
}

fn recreate_site(storage: &SharedStorage, root: &SiteRoot, name: &str) -> StorageResult<i64> {
    if remove_site(storage, root.as_str())? {
        tracing::info!("Removed earlier index of {}", root.as_str());
    }
    lock(storage)?.create_site(root.as_str(), name)
}

/// Promotes a site whose run ended, keeping a recorded failure
fn complete_site(storage: &SharedStorage, site_id: i64) -> StorageResult<SiteStatus> {
    let mut storage = lock(storage)?;
    storage.atomically(|storage| {
        let current = storage.get_site(site_id)?.status;
        let next = SiteStatus::on_completion(current);
        if next != current {
            storage.update_site_status(site_id, next)?;
        }
        Ok(next)
    })
}

fn fail_unfinished_sites(storage: &SharedStorage) -> StorageResult<usize> {
    let mut storage = lock(storage)?;
    storage.atomically(|storage| {
        let mut failed = 0;
        for site in storage.list_sites()? {
            if site.status != SiteStatus::Indexed {
                storage.record_site_error(site.id, STOPPED_MESSAGE)?;
                failed += 1;
            }
        }
        Ok(failed)
    })
}
