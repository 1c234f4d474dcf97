use crate::browser::{BrowserDriver, CacheMode, RunConfig, Session};
use crate::explore::ExplorationStrategy;
use crate::sanitizer::SanitizerChain;
use crate::{FinsightError, Result};
use std::sync::Arc;

/// Discovers article URLs from a seed page
///
/// The extractor owns one browser session, created on first use and reused
/// by every call, so strategies that rely on DOM state (scrolling) see the
/// page loaded in step one.
pub struct UrlExtractor {
    driver: Arc<dyn BrowserDriver>,
    session: Session,
    run_config: RunConfig,
    dedupe: bool,
}

impl UrlExtractor {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            session: Session::generate(),
            run_config: RunConfig::default(),
            dedupe: true,
        }
    }

    /// Uses a caller-supplied session instead of a generated one
    pub fn with_session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    /// Base options for every load; the session id is always overridden
    pub fn with_run_config(mut self, run_config: RunConfig) -> Self {
        self.run_config = run_config;
        self
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Loads `seed_url`, explores from it and sanitizes what was found
    ///
    /// The seed is loaded fresh in this extractor's session, without any
    /// script, so scroll exploration continues from that page.
    ///
    /// # Arguments
    ///
    /// * `seed_url` - Page discovery starts from
    /// * `strategy` - Scroll or deep exploration
    /// * `chain` - Sanitizer stages applied to every discovered URL
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<String>)` - Clean URLs, deduplicated unless disabled
    /// * `Err(FinsightError)` - If the seed page fails to load
    ///
    /// # Errors
    ///
    /// [`FinsightError::PageLoad`] when the seed page cannot be loaded.
    /// Failures during exploration only shrink the result.
    pub async fn extract(
        &self,
        seed_url: &str,
        strategy: &ExplorationStrategy,
        chain: &SanitizerChain,
    ) -> Result<Vec<String>> {
        let seed_config = self
            .run_config
            .clone()
            .with_session(self.session.id())
            .with_cache_mode(CacheMode::Bypass);
        let seed_config = RunConfig {
            js_code: None,
            js_only: false,
            ..seed_config
        };

        let seed = self.driver.load(seed_url, &seed_config).await;
        if !seed.success {
            let message = seed
                .error_message
                .unwrap_or_else(|| "unknown error".to_string());
            tracing::error!(url = %seed_url, error = %message, "Seed page failed to load");
            return Err(FinsightError::PageLoad {
                url: seed_url.to_string(),
                message,
            });
        }
        tracing::info!(
            url = %seed.url,
            strategy = strategy.name(),
            session = %self.session.id(),
            "Seed page loaded"
        );

        let raw = strategy
            .explore(self.driver.as_ref(), &self.session, seed_url, &self.run_config)
            .await;
        let raw_count = raw.len();
        let urls = chain.sanitize(raw, self.dedupe);

        tracing::info!(
            raw = raw_count,
            sanitized = urls.len(),
            dedupe = self.dedupe,
            "URL extraction finished"
        );
        Ok(urls)
    }

    /// Releases the browser session
    pub async fn close(&self) {
        self.driver.close_session(self.session.id()).await;
    }
}
