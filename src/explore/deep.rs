//! Best-first multi-page discovery
//!
//! Candidates found on each visited page pass a domain filter and a URL
//! pattern filter before they enter the [`Frontier`]. The frontier hands out
//! the highest-scored candidate first, so a small page budget is spent on the
//! most relevant branches.

use crate::browser::{BrowserDriver, Link, RunConfig};
use crate::config::DeepConfig;
use crate::explore::frontier::{Candidate, Frontier};
use crate::explore::scorer::{KeywordRelevanceScorer, RelevanceScorer, ScoreContext};
use crate::url::{compile_patterns, matches_any_domain, matches_any_pattern, visit_key, UrlPattern};
use crate::UrlResult;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Bounds and filters of a deep crawl
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Domain patterns (`example.com`, `*.example.com`); empty allows any domain
    pub allowed_domains: Vec<String>,
    /// Empty allows any URL
    pub url_patterns: Vec<UrlPattern>,
    /// Maximum hops from the seed
    pub max_depth: u32,
    /// Maximum page visits, failed ones included
    pub max_pages: usize,
}

impl FilterConfig {
    pub fn new(max_depth: u32, max_pages: usize) -> Self {
        Self {
            allowed_domains: Vec::new(),
            url_patterns: Vec::new(),
            max_depth,
            max_pages,
        }
    }

    pub fn with_allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_url_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> UrlResult<Self> {
        self.url_patterns = compile_patterns(patterns)?;
        Ok(self)
    }

    /// Runs both filters against a candidate
    pub fn evaluate(&self, url: &Url) -> FilterDecision {
        let host = url.host_str().unwrap_or_default();
        if !matches_any_domain(&self.allowed_domains, host) {
            return FilterDecision::DomainRejected;
        }
        if !matches_any_pattern(&self.url_patterns, url) {
            return FilterDecision::PatternRejected;
        }
        FilterDecision::Accepted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Accepted,
    DomainRejected,
    PatternRejected,
}

/// Why a deep crawl ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    PageBudget,
    FrontierExhausted,
}

/// One page visit, successful or not
#[derive(Debug, Clone, PartialEq)]
pub struct PageVisit {
    pub requested_url: String,
    /// URL reported by the driver after redirects
    pub final_url: String,
    pub depth: u32,
    pub score: f64,
    pub success: bool,
    pub status_code: Option<u16>,
    pub error_message: Option<String>,
}

/// Prioritized traversal bounded by depth and page count
#[derive(Clone)]
pub struct DeepExploration {
    filter: FilterConfig,
    scorer: Option<Arc<dyn RelevanceScorer>>,
    include_external: bool,
}

impl DeepExploration {
    pub fn new(filter: FilterConfig) -> Self {
        Self {
            filter,
            scorer: None,
            include_external: false,
        }
    }

    /// Builds the strategy from a profile's `[profile.deep]` table
    pub fn from_config(config: &DeepConfig) -> UrlResult<Self> {
        let filter = FilterConfig::new(config.max_depth, config.max_pages)
            .with_allowed_domains(config.allowed_domains.iter().cloned())
            .with_url_patterns(config.url_patterns.as_slice())?;

        let mut deep = Self::new(filter).with_external_links(config.include_external);
        if !config.keywords.is_empty() {
            deep = deep.with_scorer(Arc::new(KeywordRelevanceScorer::new(&config.keywords, 1.0)));
        }
        Ok(deep)
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    pub fn with_external_links(mut self, include: bool) -> Self {
        self.include_external = include;
        self
    }

    pub fn filter(&self) -> &FilterConfig {
        &self.filter
    }

    /// Visits pages lazily, yielding each visit as it completes
    ///
    /// The seed is always visited first at depth 0 and is not filtered. Each
    /// page is loaded without a session, and external links are harvested
    /// exactly when this strategy follows them, whatever `base` says. The
    /// stream ends when `max_pages` visits have been made or nothing is left
    /// to visit.
    ///
    /// # Arguments
    ///
    /// * `driver` - Browser used for every page load
    /// * `seed_url` - First page to visit, at depth 0
    /// * `base` - Load options shared by all visits
    ///
    /// # Returns
    ///
    /// * A stream of [`PageVisit`]s in visit order, failed visits included
    pub fn stream<'a>(
        &'a self,
        driver: &'a dyn BrowserDriver,
        seed_url: &str,
        base: &RunConfig,
    ) -> BoxStream<'a, PageVisit> {
        let config = base
            .clone()
            .without_session()
            .with_external_links_excluded(!self.include_external);
        let mut traversal = Traversal {
            strategy: self,
            driver,
            config,
            frontier: Frontier::new(),
            seen: HashSet::new(),
            visited: 0,
        };
        traversal.seen.insert(visit_key(seed_url));
        traversal.frontier.push(Candidate {
            url: seed_url.to_string(),
            depth: 0,
            score: 1.0,
        });

        tracing::info!(
            url = %seed_url,
            max_depth = self.filter.max_depth,
            max_pages = self.filter.max_pages,
            "Deep exploration started"
        );

        stream::unfold(traversal, |mut traversal| async move {
            let visit = traversal.next_visit().await?;
            Some((visit, traversal))
        })
        .boxed()
    }

    /// Final URLs of every successfully visited page, in visit order
    ///
    /// # Arguments
    ///
    /// * `driver` - Browser used for every page load
    /// * `seed_url` - First page to visit
    /// * `base` - Load options shared by all visits
    ///
    /// # Returns
    ///
    /// * One `Some(url)` per successful visit; failed visits are left out
    pub async fn explore(
        &self,
        driver: &dyn BrowserDriver,
        seed_url: &str,
        base: &RunConfig,
    ) -> Vec<Option<String>> {
        self.stream(driver, seed_url, base)
            .filter_map(|visit| async move { visit.success.then_some(Some(visit.final_url)) })
            .collect()
            .await
    }
}

impl fmt::Debug for DeepExploration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepExploration")
            .field("filter", &self.filter)
            .field("scored", &self.scorer.is_some())
            .field("include_external", &self.include_external)
            .finish()
    }
}

struct Traversal<'a> {
    strategy: &'a DeepExploration,
    driver: &'a dyn BrowserDriver,
    config: RunConfig,
    frontier: Frontier,
    seen: HashSet<String>,
    visited: usize,
}

impl Traversal<'_> {
    async fn next_visit(&mut self) -> Option<PageVisit> {
        let strategy = self.strategy;
        let filter = &strategy.filter;
        if self.visited >= filter.max_pages {
            self.stop(StopReason::PageBudget);
            return None;
        }
        let Some(candidate) = self.frontier.pop() else {
            self.stop(StopReason::FrontierExhausted);
            return None;
        };
        self.visited += 1;

        let result = self.driver.load(&candidate.url, &self.config).await;
        if !result.success {
            tracing::warn!(
                url = %candidate.url,
                depth = candidate.depth,
                error = result.error_message.as_deref().unwrap_or("unknown"),
                "Deep crawl visit failed"
            );
        } else {
            tracing::debug!(
                url = %result.url,
                depth = candidate.depth,
                score = candidate.score,
                links = result.links.internal.len(),
                "Visited page"
            );
            self.seen.insert(visit_key(&result.url));
            if candidate.depth < filter.max_depth {
                let mut links = result.links.internal.clone();
                if strategy.include_external {
                    links.extend(result.links.external.iter().cloned());
                }
                self.enqueue_children(&result.url, candidate.depth + 1, links);
            }
        }

        Some(PageVisit {
            requested_url: candidate.url,
            final_url: result.url,
            depth: candidate.depth,
            score: candidate.score,
            success: result.success,
            status_code: result.status_code,
            error_message: result.error_message,
        })
    }

    fn enqueue_children(&mut self, parent_url: &str, depth: u32, links: Vec<Link>) {
        for link in links {
            let Ok(url) = Url::parse(&link.href) else {
                continue;
            };
            match self.strategy.filter.evaluate(&url) {
                FilterDecision::Accepted => {}
                decision => {
                    tracing::trace!(url = %link.href, ?decision, "Filtered candidate");
                    continue;
                }
            }
            if !self.seen.insert(visit_key(&link.href)) {
                continue;
            }

            let score = match &self.strategy.scorer {
                Some(scorer) => scorer.score(
                    &link.href,
                    &ScoreContext {
                        depth,
                        parent_url,
                        anchor_text: &link.text,
                    },
                ),
                None => 0.0,
            };
            self.frontier.push(Candidate {
                url: link.href,
                depth,
                score,
            });
        }
    }

    fn stop(&self, reason: StopReason) {
        tracing::info!(
            ?reason,
            visited = self.visited,
            queued = self.frontier.len(),
            "Deep exploration stopped"
        );
    }
}
