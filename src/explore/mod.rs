//! Link discovery strategies
//!
//! An [`ExplorationStrategy`] turns a seed page into a raw list of candidate
//! URLs. The list is unsanitized: it may repeat URLs and holds `None` where
//! an action failed.

mod clock;
mod deep;
mod frontier;
mod scorer;
mod scroll;

pub use clock::{Clock, ManualClock, TokioClock};
pub use deep::{DeepExploration, FilterConfig, FilterDecision, PageVisit, StopReason};
pub use frontier::{Candidate, Frontier};
pub use scorer::{KeywordRelevanceScorer, RelevanceScorer, ScoreContext};
pub use scroll::ScrollExploration;

use crate::browser::{BrowserDriver, RunConfig, Session};

/// The closed set of discovery strategies
#[derive(Debug, Clone)]
pub enum ExplorationStrategy {
    Scroll(ScrollExploration),
    Deep(DeepExploration),
}

impl ExplorationStrategy {
    /// Discovers candidate URLs starting from `seed_url`
    ///
    /// `session` must already hold the loaded seed page for scroll discovery.
    /// Deep discovery opens a fresh context per page and ignores it.
    pub async fn explore(
        &self,
        driver: &dyn BrowserDriver,
        session: &Session,
        seed_url: &str,
        base: &RunConfig,
    ) -> Vec<Option<String>> {
        match self {
            Self::Scroll(scroll) => scroll.explore(driver, session, seed_url, base).await,
            Self::Deep(deep) => deep.explore(driver, seed_url, base).await,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Scroll(_) => "scroll",
            Self::Deep(_) => "deep",
        }
    }
}

impl From<ScrollExploration> for ExplorationStrategy {
    fn from(strategy: ScrollExploration) -> Self {
        Self::Scroll(strategy)
    }
}

impl From<DeepExploration> for ExplorationStrategy {
    fn from(strategy: DeepExploration) -> Self {
        Self::Deep(strategy)
    }
}
