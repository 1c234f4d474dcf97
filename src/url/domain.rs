use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use finsight_crawl::url::extract_domain;
///
/// let url = Url::parse("https://FINANCE.yahoo.com/news").unwrap();
/// assert_eq!(extract_domain(&url), Some("finance.yahoo.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the host with any leading `www.` removed
///
/// Two pages belong to the same site when their site hosts are equal, so
/// `www.example.com` and `example.com` are treated as one site.
pub fn site_host(url: &Url) -> Option<String> {
    extract_domain(url).map(|host| match host.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => host,
    })
}

/// Checks whether two URLs point at the same site
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (site_host(a), site_host(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
