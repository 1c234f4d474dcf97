//! Chain-of-responsibility URL sanitizer
//!
//! Each stage receives the previous stage's output. The first stage that
//! returns `None` discards the URL; nothing is ever raised for malformed input.

use crate::{FinsightError, Result};
use std::collections::HashSet;

/// A single URL transform or filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSanitizer {
    /// Drops everything from the first `?` onward
    StripQuery,
    /// Keeps the URL only if it starts with the given prefix
    Prefix(String),
    /// Discards empty and whitespace-only entries
    RejectEmpty,
}

impl UrlSanitizer {
    /// Applies this stage to one URL
    pub fn apply(&self, url: &str) -> Option<String> {
        match self {
            Self::StripQuery => Some(match url.find('?') {
                Some(idx) => url[..idx].to_string(),
                None => url.to_string(),
            }),
            Self::Prefix(prefix) => url.starts_with(prefix.as_str()).then(|| url.to_string()),
            Self::RejectEmpty => (!url.trim().is_empty()).then(|| url.to_string()),
        }
    }
}

/// An ordered, immutable list of [`UrlSanitizer`] stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizerChain {
    stages: Vec<UrlSanitizer>,
}

impl SanitizerChain {
    /// Builds a chain; an empty stage list is a configuration error
    pub fn new(stages: Vec<UrlSanitizer>) -> Result<Self> {
        if stages.is_empty() {
            return Err(FinsightError::InvalidConfiguration(
                "sanitizer chain needs at least one stage".to_string(),
            ));
        }
        Ok(Self { stages })
    }

    /// The chain used for a site's article namespace: strip query, keep the
    /// article prefix, drop empties
    pub fn for_article_prefix(prefix: &str) -> Self {
        Self {
            stages: vec![
                UrlSanitizer::StripQuery,
                UrlSanitizer::Prefix(prefix.to_string()),
                UrlSanitizer::RejectEmpty,
            ],
        }
    }

    pub fn stages(&self) -> &[UrlSanitizer] {
        &self.stages
    }

    /// Runs one URL through every stage
    ///
    /// A `None` input, or a stage returning `None`, discards the URL. Empty
    /// output is always discarded, even without a [`UrlSanitizer::RejectEmpty`] stage.
    pub fn sanitize_url(&self, url: Option<&str>) -> Option<String> {
        let mut current = url?.to_string();
        for stage in &self.stages {
            current = stage.apply(&current)?;
        }
        (!current.trim().is_empty()).then_some(current)
    }

    /// Sanitizes a batch of raw URLs
    ///
    /// With `dedupe` set, only the first occurrence of each cleaned URL is kept;
    /// otherwise the output keeps every surviving entry in input order.
    ///
    /// # Arguments
    ///
    /// * `urls` - Raw exploration output; `None` marks a failed action
    /// * `dedupe` - Drop repeats of an already kept URL
    ///
    /// # Returns
    ///
    /// * Clean, non-empty URLs in first-seen order
    pub fn sanitize<I>(&self, urls: I, dedupe: bool) -> Vec<String>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        let mut seen = HashSet::new();
        urls.into_iter()
            .filter_map(|url| self.sanitize_url(url.as_deref()))
            .filter(|url| !dedupe || seen.insert(url.clone()))
            .collect()
    }
}
