/// Checks if a host matches a domain pattern
///
/// `"example.com"` matches only that host. `"*.example.com"` matches the bare
/// domain and any subdomain below it.
///
/// # Examples
///
/// ```
/// use finsight_crawl::url::matches_wildcard;
///
/// assert!(matches_wildcard("finance.yahoo.com", "finance.yahoo.com"));
/// assert!(matches_wildcard("*.yahoo.com", "finance.yahoo.com"));
/// assert!(matches_wildcard("*.yahoo.com", "yahoo.com"));
/// assert!(!matches_wildcard("*.yahoo.com", "notyahoo.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    match pattern.strip_prefix("*.") {
        Some(base) => candidate == base || candidate.ends_with(&format!(".{}", base)),
        None => candidate == pattern,
    }
}

/// Checks a host against a set of domain patterns
///
/// Hosts are compared case-insensitively and with any `www.` prefix removed
/// on both sides. An empty pattern set allows every host.
pub fn matches_any_domain<S: AsRef<str>>(patterns: &[S], host: &str) -> bool {
    if patterns.is_empty() {
        return true;
    }

    let host = strip_www(&host.to_lowercase()).to_string();
    patterns.iter().any(|pattern| {
        let pattern = pattern.as_ref().to_lowercase();
        match pattern.strip_prefix("*.") {
            Some(_) => matches_wildcard(&pattern, &host),
            None => matches_wildcard(strip_www(&pattern), &host),
        }
    })
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}
