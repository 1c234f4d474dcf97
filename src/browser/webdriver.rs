//! WebDriver driver
//!
//! Drives chromedriver, geckodriver or a Selenium server through
//! [`fantoccini`]. Each logical [`Session`](super::Session) id maps to one
//! [`Client`] that stays open until [`BrowserDriver::close_session`] is
//! called, so scroll actions see the DOM left behind by earlier loads.

use crate::browser::{build_http_client, build_page_result, BrowserDriver, CacheMode, PageResult, RunConfig};
use crate::config::{BrowserName, BrowserSettings, UserAgentConfig};
use crate::robots::RobotsGuard;
use async_trait::async_trait;
use fantoccini::error::{CmdError, NewSessionError};
use fantoccini::wd::{Capabilities, TimeoutConfiguration};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Status of the main document, when the browser exposes it
const STATUS_SCRIPT: &str = r#"
    const nav = (performance.getEntriesByType('navigation') || [])[0] || {};
    return nav.responseStatus || null;
"#;

/// Errors raised while driving a browser session
///
/// These never leave the driver: [`BrowserDriver::load`] folds them into a
/// failed [`PageResult`].
#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("failed to open browser: {0}")]
    Session(#[from] NewSessionError),

    #[error("webdriver command failed: {0}")]
    Command(#[from] CmdError),

    #[error("wait condition 'css:{selector}' timed out after {timeout_ms}ms")]
    WaitTimeout { selector: String, timeout_ms: u128 },

    #[error("no page has been loaded in session '{0}'")]
    NoPage(String),

    #[error("empty page snapshot")]
    EmptySnapshot,
}

type SessionSlot = Arc<Mutex<Option<Client>>>;

/// A [`BrowserDriver`] backed by a WebDriver server
pub struct WebDriverBrowser {
    robots_client: reqwest::Client,
    endpoint: String,
    browser: BrowserName,
    headless: bool,
    user_agent: String,
    page_timeout: Duration,
    wait_timeout: Duration,
    robots: RobotsGuard,
    // One slot per logical session; the slot lock serializes actions within it
    sessions: Mutex<HashMap<String, SessionSlot>>,
    cache: Mutex<HashMap<String, PageResult>>,
}

impl WebDriverBrowser {
    /// Creates a driver for the server at `settings.webdriver_url`
    ///
    /// No browser is started here; the first load of each session opens one.
    ///
    /// # Arguments
    ///
    /// * `settings` - Endpoint, browser choice, headless flag and timeouts
    /// * `user_agent` - Identity sent by the browser and by robots.txt fetches
    ///
    /// # Returns
    ///
    /// * `Ok(WebDriverBrowser)` - Ready to load pages
    /// * `Err(reqwest::Error)` - If the robots.txt client cannot be built
    pub fn new(
        settings: &BrowserSettings,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, reqwest::Error> {
        let page_timeout = Duration::from_millis(settings.page_timeout_ms);
        let robots_client = build_http_client(user_agent, page_timeout)?;

        Ok(Self {
            robots_client,
            endpoint: settings.webdriver_url.trim_end_matches('/').to_string(),
            browser: settings.browser_name,
            headless: settings.headless,
            user_agent: user_agent.header_value(),
            page_timeout,
            wait_timeout: Duration::from_millis(settings.wait_timeout_ms),
            robots: RobotsGuard::new(&user_agent.crawler_name),
            sessions: Mutex::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
        })
    }

    async fn open_client(&self) -> Result<Client, WebDriverError> {
        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());
        let client = builder.connect(&self.endpoint).await?;

        let timeouts = TimeoutConfiguration::new(None, Some(self.page_timeout), None);
        if let Err(e) = client.update_timeouts(timeouts).await {
            tracing::warn!(error = %e, "Browser rejected page load timeout");
        }
        Ok(client)
    }

    async fn close_client(client: Client) {
        if let Err(e) = client.close().await {
            tracing::warn!(error = %e, "Failed to close browser session");
        }
    }

    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::new();
        caps.insert("acceptInsecureCerts".to_string(), json!(true));
        match self.browser {
            BrowserName::Firefox => {
                let mut args = Vec::new();
                if self.headless {
                    args.push("-headless".to_string());
                }
                caps.insert("browserName".to_string(), json!("firefox"));
                caps.insert(
                    "moz:firefoxOptions".to_string(),
                    json!({
                        "args": args,
                        "prefs": { "general.useragent.override": self.user_agent }
                    }),
                );
            }
            BrowserName::Chrome => {
                let mut args = vec![
                    format!("--user-agent={}", self.user_agent),
                    "--window-size=1400,1200".to_string(),
                    "--disable-gpu".to_string(),
                    "--disable-dev-shm-usage".to_string(),
                    "--no-first-run".to_string(),
                    "--no-default-browser-check".to_string(),
                ];
                if self.headless {
                    args.push("--headless=new".to_string());
                }
                if !cfg!(target_os = "macos") {
                    args.push("--no-sandbox".to_string());
                }
                caps.insert("browserName".to_string(), json!("chrome"));
                caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
            }
        }
        caps
    }

    async fn session_slot(&self, session_id: &str) -> SessionSlot {
        self.sessions
            .lock()
            .await
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    async fn wait_for_selector(&self, client: &Client, selector: &str) -> Result<(), WebDriverError> {
        let waited = client
            .wait()
            .at_most(self.wait_timeout)
            .every(WAIT_POLL_INTERVAL)
            .for_element(Locator::Css(selector))
            .await;
        match waited {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(WebDriverError::WaitTimeout {
                selector: selector.to_string(),
                timeout_ms: self.wait_timeout.as_millis(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn run(&self, client: &Client, url: &str, config: &RunConfig) -> Result<PageResult, WebDriverError> {
        if !config.js_only {
            client.goto(url).await?;
        }

        if let Some(selector) = config.wait_selector() {
            self.wait_for_selector(client, selector).await?;
        }

        if let Some(script) = &config.js_code {
            client.execute(script, Vec::new()).await?;
        }

        let status = client
            .execute(STATUS_SCRIPT, Vec::new())
            .await?
            .as_u64()
            .and_then(|s| u16::try_from(s).ok());
        let final_url = client.current_url().await?.to_string();
        let html = client.source().await?;

        if let Some(code) = status.filter(|code| *code >= 400) {
            return Ok(PageResult::failure(&final_url, format!("HTTP {}", code)).with_status(code));
        }
        if html.trim().is_empty() {
            return Err(WebDriverError::EmptySnapshot);
        }

        Ok(build_page_result(&final_url, status, &html, config))
    }

    /// Runs one action in the client held by `slot`, opening it if needed
    async fn act(&self, slot: &SessionSlot, url: &str, config: &RunConfig) -> Result<PageResult, WebDriverError> {
        let mut current = slot.lock().await;

        let client = match current.as_ref() {
            Some(existing) => existing.clone(),
            None if config.js_only => {
                let id = config.session_id.clone().unwrap_or_default();
                return Err(WebDriverError::NoPage(id));
            }
            None => {
                let opened = self.open_client().await?;
                tracing::debug!(session = ?config.session_id, "Opened browser session");
                *current = Some(opened.clone());
                opened
            }
        };

        let result = self.run(&client, url, config).await;

        if config.session_id.is_none() {
            current.take();
            Self::close_client(client).await;
        }
        result
    }
}

#[async_trait]
impl BrowserDriver for WebDriverBrowser {
    async fn load(&self, url: &str, config: &RunConfig) -> PageResult {
        if config.check_robots_txt
            && !config.js_only
            && !self.robots.is_allowed(&self.robots_client, url).await
        {
            tracing::info!(url = %url, "Blocked by robots.txt");
            return PageResult::failure(url, "disallowed by robots.txt");
        }

        let cacheable = config.cache_mode == CacheMode::Enabled && !config.js_only;
        if cacheable {
            if let Some(cached) = self.cache.lock().await.get(url) {
                return cached.clone();
            }
        }

        let slot = match &config.session_id {
            Some(id) => self.session_slot(id).await,
            None => SessionSlot::default(),
        };
        let result = self
            .act(&slot, url, config)
            .await
            .unwrap_or_else(|e| PageResult::failure(url, e.to_string()));

        tracing::debug!(
            url = %url,
            success = result.success,
            in_place = config.js_only,
            "Browser action finished"
        );

        if cacheable && result.success {
            self.cache.lock().await.insert(url.to_string(), result.clone());
        }

        result
    }

    async fn close_session(&self, session_id: &str) {
        let Some(slot) = self.sessions.lock().await.remove(session_id) else {
            return;
        };
        let client = slot.lock().await.take();
        if let Some(client) = client {
            Self::close_client(client).await;
            tracing::debug!(session = %session_id, "Closed browser session");
        }
    }
}
