use std::sync::atomic::{AtomicU64, Ordering};

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Handle to a persistent browser context
///
/// Scroll actions must run against the same session as the page load that
/// preceded them, otherwise the DOM and scroll position are lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Session {
    id: String,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Creates a session with a process-unique id
    pub fn generate() -> Self {
        let n = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("finsight-{}-{}", std::process::id(), n),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Whether a driver may answer from its page cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Always fetch fresh content
    #[default]
    Bypass,
    /// Reuse a previously fetched page for the same URL
    Enabled,
}

/// Per-request options understood by every [`BrowserDriver`](super::BrowserDriver)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunConfig {
    /// Logical session to run in; `None` uses a throwaway context
    pub session_id: Option<String>,
    pub cache_mode: CacheMode,
    /// Readiness condition, `css:<selector>`
    pub wait_for: Option<String>,
    /// Script run after the page is ready
    pub js_code: Option<String>,
    /// Run `js_code` against the current page without navigating
    pub js_only: bool,
    /// Element names removed from the returned HTML
    pub excluded_tags: Vec<String>,
    /// Keep `data-*` attributes in the returned HTML
    pub keep_data_attributes: bool,
    pub check_robots_txt: bool,
    /// Return no external links
    pub exclude_external_links: bool,
}

impl RunConfig {
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn without_session(mut self) -> Self {
        self.session_id = None;
        self
    }

    pub fn with_cache_mode(mut self, cache_mode: CacheMode) -> Self {
        self.cache_mode = cache_mode;
        self
    }

    pub fn with_wait_for(mut self, condition: impl Into<String>) -> Self {
        self.wait_for = Some(condition.into());
        self
    }

    /// Sets a script to run; `in_place` skips navigation
    pub fn with_script(mut self, js_code: impl Into<String>, in_place: bool) -> Self {
        self.js_code = Some(js_code.into());
        self.js_only = in_place;
        self
    }

    pub fn with_excluded_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_robots_check(mut self, check: bool) -> Self {
        self.check_robots_txt = check;
        self
    }

    pub fn with_external_links_excluded(mut self, exclude: bool) -> Self {
        self.exclude_external_links = exclude;
        self
    }

    /// The selector of a `css:` wait condition
    pub fn wait_selector(&self) -> Option<&str> {
        self.wait_for
            .as_deref()
            .and_then(|w| w.strip_prefix("css:"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A hyperlink harvested from a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Absolute URL
    pub href: String,
    /// Anchor text, whitespace-collapsed
    pub text: String,
}

/// Links of a page split by site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLinks {
    pub internal: Vec<Link>,
    pub external: Vec<Link>,
}

/// Outcome of one driver action
///
/// Failures are reported here with `success = false` rather than as errors,
/// so a timeout is handled the same way as an HTTP error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    /// Final URL after redirects or in-page navigation
    pub url: String,
    pub success: bool,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
    pub links: PageLinks,
    pub html: String,
}

impl PageResult {
    pub fn failure(url: &str, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }
}
