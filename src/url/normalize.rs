use crate::{UrlError, UrlResult};
use url::Url;

/// File extensions that never lead to an indexable HTML page
const DENIED_EXTENSIONS: &[&str] = &[
    "pdf", "jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "ico", "tif", "tiff", "doc",
    "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "rtf", "zip", "rar", "gz", "7z", "mp3",
    "mp4", "avi", "mov", "exe",
];

/// Normalizes a configured site root
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an HTTP or HTTPS scheme and a host
/// 3. Drop query and fragment
/// 4. Remove the trailing slash, so that `root + "/path"` is a page URL
///
/// # Examples
///
/// ```
/// use lexicrawl::url::normalize_root;
///
/// let root = normalize_root("https://EXAMPLE.com/").unwrap();
/// assert_eq!(root, "https://example.com");
/// ```
pub fn normalize_root(url_str: &str) -> UrlResult<String> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_query(None);
    url.set_fragment(None);

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Canonical site-relative form of the remainder left after stripping a root
///
/// Always begins with "/"; an empty remainder is the root page itself.
pub fn canonical_path(remainder: &str) -> String {
    if remainder.trim().is_empty() {
        "/".to_string()
    } else if remainder.starts_with('/') {
        remainder.to_string()
    } else {
        format!("/{}", remainder)
    }
}

/// Returns true if the path ends in a binary or document extension
pub fn has_denied_extension(path: &str) -> bool {
    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((_, ext)) => {
            let ext = ext.to_ascii_lowercase();
            DENIED_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}

/// Returns true if the link carries a fragment marker
pub fn has_fragment(url: &Url) -> bool {
    url.fragment().is_some()
}
