//! URL handling module for LexiCrawl
//!
//! This module provides site root normalization, child-link filtering, and
//! the mapping between absolute page URLs and site-relative paths.

mod normalize;

use crate::config::SiteEntry;
use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use normalize::{canonical_path, has_denied_extension, has_fragment, normalize_root};

/// A normalized site root, the scope every crawled page must stay within
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRoot {
    /// Root without trailing slash, e.g. "https://example.com"
    prefix: String,
    parsed: Url,
}

impl SiteRoot {
    /// Parses and normalizes a site root
    pub fn parse(url_str: &str) -> UrlResult<Self> {
        let prefix = normalize_root(url_str)?;
        let parsed = Url::parse(&prefix).map_err(|e| UrlError::Parse(e.to_string()))?;
        Ok(Self { prefix, parsed })
    }

    /// The root as stored on the site record
    pub fn as_str(&self) -> &str {
        &self.prefix
    }

    /// Absolute URL of a site-relative path
    pub fn page_url(&self, path: &str) -> String {
        format!("{}{}", self.prefix, canonical_path(path))
    }

    /// Site-relative path of an absolute URL, or None if it lies outside the root
    ///
    /// The character after the prefix must start a path or query so that
    /// `https://a.test` does not claim `https://a.testing.org`.
    pub fn relative_path(&self, absolute: &str) -> Option<String> {
        let rest = absolute.strip_prefix(&self.prefix)?;
        if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')) {
            return None;
        }
        Some(canonical_path(rest))
    }

    /// Filters a discovered link and returns its site-relative path
    ///
    /// A link is kept only if it is http(s), carries no fragment, does not
    /// point at a binary document, and lies under this root.
    pub fn child_path(&self, link: &Url) -> Option<String> {
        if link.scheme() != "http" && link.scheme() != "https" {
            return None;
        }

        if has_fragment(link) || has_denied_extension(link.path()) {
            return None;
        }

        if link.origin() != self.parsed.origin() {
            return None;
        }

        self.relative_path(link.as_str())
    }
}

/// Finds the configured site a page URL belongs to
///
/// When several roots match, the longest one wins. Returns the site entry,
/// its normalized root, and the page path relative to that root.
pub fn resolve_site<'a>(
    page_url: &str,
    sites: &'a [SiteEntry],
) -> Option<(&'a SiteEntry, SiteRoot, String)> {
    let parsed = Url::parse(page_url.trim()).ok()?;
    let absolute = parsed.as_str();

    sites
        .iter()
        .filter_map(|site| {
            let root = SiteRoot::parse(&site.url).ok()?;
            let path = root.relative_path(absolute)?;
            Some((site, root, path))
        })
        .max_by_key(|(_, root, _)| root.as_str().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(url: &str, name: &str) -> SiteEntry {
        SiteEntry {
            url: url.to_string(),
            name: name.to_string(),
        }
    }

    fn link(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_page_url_and_relative_path() {
        let root = SiteRoot::parse("https://example.com/").unwrap();
        assert_eq!(root.as_str(), "https://example.com");
        assert_eq!(root.page_url("/"), "https://example.com/");
        assert_eq!(root.page_url("/a/b"), "https://example.com/a/b");

        assert_eq!(
            root.relative_path("https://example.com/a").as_deref(),
            Some("/a")
        );
        assert_eq!(root.relative_path("https://example.com").as_deref(), Some("/"));
        assert_eq!(
            root.relative_path("https://example.com?x=1").as_deref(),
            Some("/?x=1")
        );
        assert_eq!(root.relative_path("https://other.com/a"), None);
    }

    #[test]
    fn test_relative_path_respects_host_boundary() {
        let root = SiteRoot::parse("https://a.test").unwrap();
        assert_eq!(root.relative_path("https://a.testing.org/x"), None);
    }

    #[test]
    fn test_child_path_filters() {
        let root = SiteRoot::parse("https://example.com").unwrap();

        assert_eq!(
            root.child_path(&link("https://example.com/a")).as_deref(),
            Some("/a")
        );
        assert_eq!(
            root.child_path(&link("https://example.com/list?page=2")).as_deref(),
            Some("/list?page=2")
        );

        assert_eq!(root.child_path(&link("https://example.com/a#frag")), None);
        assert_eq!(root.child_path(&link("https://example.com/a#")), None);
        assert_eq!(root.child_path(&link("https://example.com/doc.pdf")), None);
        assert_eq!(root.child_path(&link("https://example.com/IMG.PNG")), None);
        assert_eq!(root.child_path(&link("https://other.test/x")), None);
        assert_eq!(root.child_path(&link("http://example.com/a")), None);
        assert_eq!(root.child_path(&link("mailto:someone@example.com")), None);
    }

    #[test]
    fn test_child_path_under_subpath_root() {
        let root = SiteRoot::parse("https://example.com/blog").unwrap();

        assert_eq!(
            root.child_path(&link("https://example.com/blog/post-1")).as_deref(),
            Some("/post-1")
        );
        assert_eq!(root.child_path(&link("https://example.com/about")), None);
        assert_eq!(root.page_url("/post-1"), "https://example.com/blog/post-1");
    }

    #[test]
    fn test_resolve_site_longest_prefix() {
        let sites = vec![
            site("https://example.com", "Main"),
            site("https://example.com/docs", "Docs"),
        ];

        let (entry, root, path) = resolve_site("https://example.com/docs/intro", &sites).unwrap();
        assert_eq!(entry.name, "Docs");
        assert_eq!(root.as_str(), "https://example.com/docs");
        assert_eq!(path, "/intro");

        let (entry, _, path) = resolve_site("https://example.com/news", &sites).unwrap();
        assert_eq!(entry.name, "Main");
        assert_eq!(path, "/news");
    }

    #[test]
    fn test_resolve_site_out_of_scope() {
        let sites = vec![site("https://example.com", "Main")];
        assert!(resolve_site("https://elsewhere.org/page", &sites).is_none());
        assert!(resolve_site("not a url", &sites).is_none());
    }
}
