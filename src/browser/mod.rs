//! Browser drivers
//!
//! Every page load, scroll action and extraction fetch goes through the
//! [`BrowserDriver`] trait. Two drivers ship with the crate:
//!
//! - [`WebDriverBrowser`] drives a WebDriver server through fantoccini and runs scripts
//! - [`HttpBrowser`] fetches static HTML with reqwest
//!
//! Both report failures in [`PageResult`] instead of returning errors, so a
//! single bad page never aborts a batch.

mod http;
mod parser;
mod types;
mod webdriver;

pub use http::{build_http_client, HttpBrowser};
pub use parser::{build_page_result, page_text, parse_page, shape_html, ParsedPage};
pub use types::{CacheMode, Link, PageLinks, PageResult, RunConfig, Session};
pub use webdriver::{WebDriverBrowser, WebDriverError};

pub(crate) use parser::collapse_whitespace;

use async_trait::async_trait;

/// A headless browser capable of loading pages within named sessions
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Loads `url` (or, with `js_only`, acts on the session's current page)
    async fn load(&self, url: &str, config: &RunConfig) -> PageResult;

    /// Releases the browser context behind `session_id`
    ///
    /// Closing an unknown session is a no-op.
    async fn close_session(&self, session_id: &str);
}
