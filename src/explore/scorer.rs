//! Relevance scoring for the deep crawl frontier

/// What the crawler knows about a candidate when it is discovered
#[derive(Debug, Clone, Copy)]
pub struct ScoreContext<'a> {
    /// Depth the candidate would be visited at
    pub depth: u32,
    pub parent_url: &'a str,
    pub anchor_text: &'a str,
}

/// Rates how promising a candidate URL is; higher expands first
///
/// Scores outside `[0, 1]` are clamped by the frontier.
pub trait RelevanceScorer: Send + Sync {
    fn score(&self, url: &str, context: &ScoreContext<'_>) -> f64;
}

/// Scores a URL by the share of keywords it contains
#[derive(Debug, Clone)]
pub struct KeywordRelevanceScorer {
    keywords: Vec<String>,
    weight: f64,
}

impl KeywordRelevanceScorer {
    pub fn new<I, S>(keywords: I, weight: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            weight,
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl RelevanceScorer for KeywordRelevanceScorer {
    fn score(&self, url: &str, _context: &ScoreContext<'_>) -> f64 {
        if self.keywords.is_empty() {
            return 0.0;
        }
        let url = url.to_lowercase();
        let hits = self.keywords.iter().filter(|k| url.contains(k.as_str())).count();
        self.weight * hits as f64 / self.keywords.len() as f64
    }
}
