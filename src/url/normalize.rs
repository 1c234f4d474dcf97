use crate::UrlError;
use url::Url;

/// Query parameters that only track where a click came from
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "mc_eid",
    "ncid",
    "guccounter",
    "guce_referrer",
    "guce_referrer_sig",
    "soc_src",
    "soc_trk",
    "tsrc",
];

/// Normalizes a URL into the key used to decide whether a page was already visited
///
/// The scheme is kept as-is (http and https are both accepted). The host is
/// lowercased without `www.`, dot segments, duplicate and trailing slashes are
/// removed, the fragment is dropped, and tracking parameters (`utm_*` and the
/// ones in [`TRACKING_PARAMS`]) are removed before the remaining parameters
/// are sorted.
///
/// # Examples
///
/// ```
/// use finsight_crawl::url::normalize_url;
///
/// let url = normalize_url("https://WWW.Example.com/news/a/?utm_source=x#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/news/a");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url
        .host_str()
        .map(|h| h.to_lowercase())
        .ok_or(UrlError::MissingDomain)?;
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("cannot set host '{}': {}", host, e)))?;

    let path = collapse_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.sort();

        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Returns the normalized form of `url_str` as a string, or the trimmed input when
/// it cannot be normalized
pub fn visit_key(url_str: &str) -> String {
    normalize_url(url_str)
        .map(String::from)
        .unwrap_or_else(|_| url_str.trim().to_string())
}

fn collapse_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
