//! Static HTML driver
//!
//! Fetches pages with reqwest and parses them without running scripts.
//! Useful for sites that render server-side, and in tests.

use crate::browser::{build_page_result, BrowserDriver, CacheMode, PageResult, RunConfig};
use crate::config::UserAgentConfig;
use crate::robots::RobotsGuard;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// Builds the HTTP client shared by page loads and robots.txt fetches
///
/// The user agent has the form `Name/Version (+ContactURL; ContactEmail)`.
///
/// # Example
///
/// ```no_run
/// use finsight_crawl::browser::build_http_client;
/// use finsight_crawl::config::UserAgentConfig;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "FinsightBot".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
///     contact_email: "bot@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// A [`BrowserDriver`] that performs plain GET requests
///
/// Scripts never run. A session remembers the last page loaded in it, and a
/// `js_only` action on that session answers with the remembered page, so
/// scroll exploration sees the links of the initial page on every tick.
/// A `js_only` action on a session with no page fails.
pub struct HttpBrowser {
    client: Client,
    robots: RobotsGuard,
    cache: Mutex<HashMap<String, PageResult>>,
    /// Last successful load per session id
    snapshots: Mutex<HashMap<String, PageResult>>,
}

impl HttpBrowser {
    /// Creates a driver with its own HTTP client
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Crawler identity; its name is also the robots.txt token
    /// * `timeout` - Per-request timeout
    ///
    /// # Returns
    ///
    /// * `Ok(HttpBrowser)` - Ready to load pages
    /// * `Err(reqwest::Error)` - If the client cannot be built
    pub fn new(user_agent: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent, timeout)?;
        Ok(Self::from_client(client, &user_agent.crawler_name))
    }

    /// Wraps an existing client; `product` is the robots.txt token
    pub fn from_client(client: Client, product: &str) -> Self {
        Self {
            client,
            robots: RobotsGuard::new(product),
            cache: Mutex::new(HashMap::new()),
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// The page a session currently shows, for in-place actions
    async fn snapshot(&self, url: &str, config: &RunConfig) -> PageResult {
        let Some(session_id) = config.session_id.as_deref() else {
            return PageResult::failure(url, "in-place action requires a session");
        };
        match self.snapshots.lock().await.get(session_id) {
            Some(page) => {
                tracing::trace!(session = %session_id, url = %page.url, "Static page cannot change; reusing snapshot");
                page.clone()
            }
            None => PageResult::failure(
                url,
                format!("no page loaded in session '{}'", session_id),
            ),
        }
    }

    async fn fetch(&self, url: &str, config: &RunConfig) -> PageResult {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("timed out: {}", e)
                } else {
                    format!("request failed: {}", e)
                };
                return PageResult::failure(url, message);
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            return PageResult::failure(&final_url, format!("HTTP {}", status))
                .with_status(status.as_u16());
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return PageResult::failure(&final_url, format!("failed to read body: {}", e))
                    .with_status(status.as_u16());
            }
        };

        if let Some(selector) = config.wait_selector() {
            if let Err(message) = static_wait(&body, selector) {
                return PageResult::failure(&final_url, message).with_status(status.as_u16());
            }
        }

        if config.js_code.is_some() {
            tracing::debug!(url = %final_url, "Ignoring script on static fetch");
        }

        build_page_result(&final_url, Some(status.as_u16()), &body, config)
    }
}

/// A static page either already satisfies the wait condition or never will
fn static_wait(html: &str, selector: &str) -> Result<(), String> {
    let parsed = Selector::parse(selector)
        .map_err(|e| format!("invalid wait selector '{}': {:?}", selector, e))?;
    if Html::parse_document(html).select(&parsed).next().is_none() {
        return Err(format!("wait condition 'css:{}' not satisfied", selector));
    }
    Ok(())
}

#[async_trait]
impl BrowserDriver for HttpBrowser {
    async fn load(&self, url: &str, config: &RunConfig) -> PageResult {
        if config.js_only {
            return self.snapshot(url, config).await;
        }

        if config.check_robots_txt && !self.robots.is_allowed(&self.client, url).await {
            tracing::info!(url = %url, "Blocked by robots.txt");
            return PageResult::failure(url, "disallowed by robots.txt");
        }

        if config.cache_mode == CacheMode::Enabled {
            if let Some(cached) = self.cache.lock().await.get(url) {
                tracing::trace!(url = %url, "Serving page from cache");
                return cached.clone();
            }
        }

        let result = self.fetch(url, config).await;
        tracing::debug!(
            url = %url,
            success = result.success,
            status = ?result.status_code,
            "Fetched page"
        );

        if config.cache_mode == CacheMode::Enabled && result.success {
            self.cache.lock().await.insert(url.to_string(), result.clone());
        }
        if let (Some(session_id), true) = (config.session_id.as_deref(), result.success) {
            self.snapshots
                .lock()
                .await
                .insert(session_id.to_string(), result.clone());
        }

        result
    }

    async fn close_session(&self, session_id: &str) {
        if self.snapshots.lock().await.remove(session_id).is_some() {
            tracing::debug!(session = %session_id, "Session closed");
        }
    }
}
