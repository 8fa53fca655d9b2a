//! State module for tracking indexing progress
//!
//! # Components
//!
//! - `SiteStatus`: Persistent status of a single site (indexing, indexed, failed)
//! - `RunState`: Process-wide indexing campaign state shared by all crawl runs

mod run_state;
mod site_status;

// Re-export main types
pub use run_state::{RunPhase, RunState};
pub use site_status::SiteStatus;
