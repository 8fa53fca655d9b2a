//! Index maintainer
//!
//! Applies lemma extraction results to the store (lemma rows with page
//! frequencies, lemma-page links with occurrence ranks) and reverses them
//! when pages or sites are removed.

mod maintainer;

pub use maintainer::{apply_page, remove_page, remove_page_by_path, remove_site, ApplyOutcome};
