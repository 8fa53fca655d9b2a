use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for LexiCrawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum depth to crawl from a site root
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Size of the shared worker pool
    #[serde(rename = "max-concurrent-tasks")]
    pub max_concurrent_tasks: u32,

    /// Wait after each link-discovery fetch (milliseconds)
    #[serde(rename = "politeness-delay")]
    pub politeness_delay: u64,

    /// Timeout for a single HTTP request (milliseconds)
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,
}

impl CrawlerConfig {
    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,

    /// Value of the Referer header sent with every request
    #[serde(default)]
    pub referrer: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header: `Name/Version (+ContactURL; ContactEmail)`
    pub fn user_agent_string(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Query engine tuning
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Lemmas present on more than this share of all pages are ignored
    #[serde(rename = "frequency-threshold", default = "default_frequency_threshold")]
    pub frequency_threshold: f64,

    /// Number of words kept on each side of the snippet anchor
    #[serde(rename = "snippet-radius", default = "default_snippet_radius")]
    pub snippet_radius: usize,

    /// Page size used when the caller gives none
    #[serde(rename = "default-limit", default = "default_limit")]
    pub default_limit: usize,
}

fn default_frequency_threshold() -> f64 {
    0.7
}

fn default_snippet_radius() -> usize {
    10
}

fn default_limit() -> usize {
    20
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            frequency_threshold: default_frequency_threshold(),
            snippet_radius: default_snippet_radius(),
            default_limit: default_limit(),
        }
    }
}

/// A site to index
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Site root, e.g. "https://example.com"
    pub url: String,

    /// Display name
    pub name: String,
}
