//! robots.txt rule matching backed by the robotstxt crate

use robotstxt::DefaultMatcher;

const DISALLOW_ALL: &str = "User-agent: *\nDisallow: /\n";

/// Rules of one site's robots.txt
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    content: String,
    allow_all: bool,
}

impl ParsedRobots {
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Rules that permit every URL
    ///
    /// Used when a site has no robots.txt.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Rules that refuse every URL
    ///
    /// Used when the robots.txt request fails on the server side.
    pub fn disallow_all() -> Self {
        Self::from_content(DISALLOW_ALL)
    }

    /// Checks `url` against the group that applies to `product`
    ///
    /// `url` may be absolute or a bare path.
    pub fn is_allowed(&self, url: &str, product: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, product, url)
    }
}
