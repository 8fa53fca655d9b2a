//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with content-type filtering
//! - HTML parsing, link extraction and visible text extraction
//! - The depth-bounded parallel crawl task tree
//! - Campaign coordination (start, stop, single-page re-index)

mod coordinator;
mod fetcher;
mod parser;
mod pool;
mod scheduler;

pub use coordinator::{Coordinator, STOPPED_MESSAGE};
pub use fetcher::{build_http_client, fetch_url, FetchResult};
pub use parser::{extract_body_text, extract_text, extract_title, parse_html, ParsedPage};
pub use pool::CrawlPool;
pub use scheduler::{run_crawl, CrawlContext, CrawlEnv};
