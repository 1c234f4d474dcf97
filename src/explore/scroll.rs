//! Time-boxed infinite-scroll discovery

use crate::browser::{BrowserDriver, CacheMode, RunConfig, Session};
use crate::explore::{Clock, TokioClock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Repeatedly scrolls a loaded feed and harvests the internal links it reveals
///
/// Every scroll runs in place against the caller's session, so the page is
/// never reloaded and lazily loaded items accumulate in the DOM.
#[derive(Clone)]
pub struct ScrollExploration {
    duration: Duration,
    scroll_interval: Duration,
    clock: Arc<dyn Clock>,
}

impl ScrollExploration {
    pub fn new(duration: Duration, scroll_interval: Duration) -> Self {
        Self {
            duration,
            scroll_interval,
            clock: Arc::new(TokioClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn scroll_interval(&self) -> Duration {
        self.scroll_interval
    }

    /// Scrolls until `duration` has elapsed
    ///
    /// Each successful tick appends every internal href of the current DOM,
    /// so links repeat across ticks. A failed tick contributes a single `None`.
    /// Elapsed time is checked once per tick, before the scroll action.
    ///
    /// # Arguments
    ///
    /// * `driver` - Browser holding the loaded seed page
    /// * `session` - Session the seed page was loaded in
    /// * `seed_url` - URL of that page, passed along with every scroll
    /// * `base` - Load options; session, cache and script are overridden
    ///
    /// # Returns
    ///
    /// * Raw hrefs in harvest order, with `None` for each failed tick
    pub async fn explore(
        &self,
        driver: &dyn BrowserDriver,
        session: &Session,
        seed_url: &str,
        base: &RunConfig,
    ) -> Vec<Option<String>> {
        let config = base
            .clone()
            .with_session(session.id())
            .with_cache_mode(CacheMode::Bypass)
            .with_script(SCROLL_TO_BOTTOM, true);

        let start = self.clock.now();
        let mut harvested = Vec::new();
        let mut ticks = 0u32;

        tracing::info!(
            url = %seed_url,
            session = %session.id(),
            duration_ms = self.duration.as_millis() as u64,
            "Scroll exploration started"
        );

        while self.clock.now().saturating_duration_since(start) < self.duration {
            ticks += 1;
            let result = driver.load(seed_url, &config).await;
            if result.success {
                let before = harvested.len();
                harvested.extend(result.links.internal.into_iter().map(|link| Some(link.href)));
                tracing::debug!(tick = ticks, links = harvested.len() - before, "Scrolled");
            } else {
                tracing::warn!(
                    tick = ticks,
                    error = result.error_message.as_deref().unwrap_or("unknown"),
                    "Scroll action failed"
                );
                harvested.push(None);
            }
            self.clock.sleep(self.scroll_interval).await;
        }

        tracing::info!(
            ticks,
            links = harvested.len(),
            elapsed_ms = self.clock.now().saturating_duration_since(start).as_millis() as u64,
            "Scroll exploration done"
        );
        harvested
    }
}

impl fmt::Debug for ScrollExploration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollExploration")
            .field("duration", &self.duration)
            .field("scroll_interval", &self.scroll_interval)
            .finish_non_exhaustive()
    }
}
