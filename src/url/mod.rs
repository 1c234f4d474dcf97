//! URL handling module
//!
//! Domain extraction, wildcard domain matching, URL glob patterns and the
//! normalization used to key visited pages.

mod domain;
mod glob;
mod matcher;
mod normalize;

pub use domain::{extract_domain, same_site, site_host};
pub use glob::{compile_patterns, matches_any_pattern, UrlPattern};
pub use matcher::{matches_any_domain, matches_wildcard};
pub use normalize::{normalize_url, visit_key};

/// Returns true if the string parses as an absolute http(s) URL
pub fn is_http_url(candidate: &str) -> bool {
    ::url::Url::parse(candidate)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://finance.yahoo.com/news"));
        assert!(is_http_url("http://127.0.0.1:9000/"));
        assert!(!is_http_url("mailto:desk@example.com"));
        assert!(!is_http_url("/relative/path"));
        assert!(!is_http_url(""));
    }
}
