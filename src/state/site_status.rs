/// Site status definitions for tracking indexing progress
///
/// A site is always in exactly one of these states.
use std::fmt;

/// Represents the indexing status of a site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteStatus {
    /// A crawl run for the site is in progress
    Indexing,

    /// The last crawl run completed without a recorded failure
    Indexed,

    /// A fetch failed during the run, or the run was stopped
    Failed,
}

impl SiteStatus {
    /// Returns true if a crawl run is still working on the site
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Indexing)
    }

    /// Returns true if this status must survive run completion
    ///
    /// Completion promotes INDEXING to INDEXED but never overwrites FAILED.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Status a finished run leaves behind, given the status read back at completion
    pub fn on_completion(current: Self) -> Self {
        if current.is_failure() {
            Self::Failed
        } else {
            Self::Indexed
        }
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "INDEXING" => Some(Self::Indexing),
            "INDEXED" => Some(Self::Indexed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible site statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![Self::Indexing, Self::Indexed, Self::Failed]
    }
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
