//! robots.txt handling
//!
//! [`RobotsGuard`] fetches each origin's robots.txt once, caches it for a day
//! and answers whether a URL may be loaded.
//!
//! | robots.txt response | Outcome |
//! |---------------------|---------|
//! | 2xx | Rules are parsed and applied |
//! | 4xx | Everything is allowed |
//! | 5xx | Everything is disallowed |
//! | Network error | Everything is allowed |

mod cache;
mod parser;

pub use cache::CachedRobots;
pub use parser::ParsedRobots;

use reqwest::Client;
use std::collections::HashMap;
use tokio::sync::Mutex;
use url::Url;

/// Cached robots.txt checks for one crawler identity
#[derive(Debug)]
pub struct RobotsGuard {
    product: String,
    cache: Mutex<HashMap<String, CachedRobots>>,
}

impl RobotsGuard {
    /// `product` is the token matched against `User-agent` lines
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    /// Whether `url` may be fetched; URLs that do not parse are refused
    ///
    /// Rules are cached per origin and refetched once the entry is stale.
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for the robots.txt request
    /// * `url` - Absolute URL about to be loaded
    ///
    /// # Returns
    ///
    /// * `true` if the crawler may fetch `url`
    pub async fn is_allowed(&self, client: &Client, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let origin = parsed.origin().ascii_serialization();

        {
            let cache = self.cache.lock().await;
            if let Some(entry) = cache.get(&origin).filter(|entry| !entry.is_stale()) {
                return entry.is_allowed(url, &self.product);
            }
        }

        let robots = fetch_robots(client, &origin).await;
        let allowed = robots.is_allowed(url, &self.product);
        self.cache
            .lock()
            .await
            .insert(origin, CachedRobots::new(robots));
        allowed
    }
}

/// Fetches and parses `<origin>/robots.txt`
///
/// # Arguments
///
/// * `client` - HTTP client carrying the crawler's user agent
/// * `origin` - Scheme, host and port, e.g. `https://finance.yahoo.com`
///
/// # Returns
///
/// * The parsed rules; a missing file allows all and a 5xx answer disallows all
pub async fn fetch_robots(client: &Client, origin: &str) -> ParsedRobots {
    let robots_url = format!("{}/robots.txt", origin.trim_end_matches('/'));

    let response = match client.get(&robots_url).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url = %robots_url, error = %e, "robots.txt unreachable, allowing all");
            return ParsedRobots::allow_all();
        }
    };

    let status = response.status();
    if status.is_server_error() {
        tracing::warn!(url = %robots_url, status = status.as_u16(), "robots.txt server error, disallowing all");
        return ParsedRobots::disallow_all();
    }
    if !status.is_success() {
        tracing::debug!(url = %robots_url, status = status.as_u16(), "No robots.txt, allowing all");
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => ParsedRobots::from_content(&body),
        Err(e) => {
            tracing::debug!(url = %robots_url, error = %e, "Failed to read robots.txt, allowing all");
            ParsedRobots::allow_all()
        }
    }
}
