//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests carrying the configured Referer header
//! - Content-Type filtering (only HTML is kept)
//! - Error classification into per-link failures

use crate::config::{CrawlerConfig, UserAgentConfig};
use reqwest::header::{CONTENT_TYPE, REFERER};
use reqwest::{redirect::Policy, Client};

/// Maximum redirect hops followed for one request
const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched an HTML page
    Success {
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Page body content
        body: String,
    },

    /// Page is not HTML; skipped without error
    NotHtml {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

impl FetchResult {
    /// Message recorded as the site's last error, if this fetch failed
    pub fn failure_message(&self, url: &str) -> Option<String> {
        match self {
            Self::HttpError { status_code } => Some(format!("HTTP {} for {}", status_code, url)),
            Self::NetworkError { error } => Some(format!("{} ({})", error, url)),
            Self::Success { .. } | Self::NotHtml { .. } => None,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Crawl parameters, for the request timeout
///
/// # Example
///
/// ```
/// use lexicrawl::config::{CrawlerConfig, UserAgentConfig};
/// use lexicrawl::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "LexiCrawl".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
///     referrer: None,
/// };
/// let crawler = CrawlerConfig {
///     max_depth: 3,
///     max_concurrent_tasks: 4,
///     politeness_delay: 100,
///     request_timeout: 5000,
/// };
///
/// let client = build_http_client(&user_agent, &crawler).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.user_agent_string())
        .timeout(crawler.request_timeout())
        .connect_timeout(crawler.request_timeout())
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and classifies the outcome
///
/// # Outcomes
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with `text/html` | Success |
/// | 2xx with any other Content-Type | NotHtml |
/// | Non-2xx status | HttpError |
/// | Timeout, connection or body error | NetworkError |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The absolute URL to fetch
/// * `referrer` - Value for the Referer header
pub async fn fetch_url(client: &Client, url: &str, referrer: Option<&str>) -> FetchResult {
    let mut request = client.get(url);
    if let Some(referrer) = referrer {
        request = request.header(REFERER, referrer);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };

    let status = response.status();
    if !status.is_success() {
        return FetchResult::HttpError {
            status_code: status.as_u16(),
        };
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_html(&content_type) {
        return FetchResult::NotHtml { content_type };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            status_code: status.as_u16(),
            content_type,
            body,
        },
        Err(e) => classify_error(&e),
    }
}

fn classify_error(e: &reqwest::Error) -> FetchResult {
    let error = if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else if e.is_redirect() {
        "Too many redirects".to_string()
    } else {
        e.to_string()
    };

    FetchResult::NetworkError { error }
}

/// Returns true for `text/html` media types, ignoring parameters and case
fn is_html(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|media| media.trim().eq_ignore_ascii_case("text/html"))
        .unwrap_or(false)
}
