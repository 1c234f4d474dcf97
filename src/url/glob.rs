use crate::UrlError;
use regex::Regex;
use url::Url;

/// A compiled URL glob
///
/// `*` matches any run of characters (including `/`) and `?` matches exactly
/// one character. A pattern starting with `/` is matched against the URL path
/// only; any other pattern is matched against the full URL string.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    source: String,
    regex: Regex,
    path_only: bool,
}

impl UrlPattern {
    /// Compiles a glob pattern
    ///
    /// # Examples
    ///
    /// ```
    /// use finsight_crawl::url::UrlPattern;
    /// use url::Url;
    ///
    /// let pattern = UrlPattern::new("/news/*.html").unwrap();
    /// let url = Url::parse("https://finance.yahoo.com/news/fed-rates-1.html").unwrap();
    /// assert!(pattern.matches(&url));
    /// ```
    pub fn new(pattern: &str) -> Result<Self, UrlError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(UrlError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "pattern cannot be empty".to_string(),
            });
        }

        let mut expr = String::with_capacity(pattern.len() * 2 + 2);
        expr.push('^');
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| UrlError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
            path_only: pattern.starts_with('/'),
        })
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, url: &Url) -> bool {
        if self.path_only {
            self.regex.is_match(url.path())
        } else {
            self.regex.is_match(url.as_str())
        }
    }
}

/// Compiles a list of glob patterns, failing on the first invalid one
pub fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<UrlPattern>, UrlError> {
    patterns.iter().map(|p| UrlPattern::new(p.as_ref())).collect()
}

/// Checks a URL against a pattern set; an empty set matches everything
pub fn matches_any_pattern(patterns: &[UrlPattern], url: &Url) -> bool {
    patterns.is_empty() || patterns.iter().any(|p| p.matches(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_path_pattern() {
        let p = UrlPattern::new("/news/*").unwrap();
        assert!(p.matches(&url("https://example.com/news/a/b.html")));
        assert!(!p.matches(&url("https://example.com/video/news/a")));
    }

    #[test]
    fn test_full_url_pattern() {
        let p = UrlPattern::new("*://finance.yahoo.com/news/*").unwrap();
        assert!(p.matches(&url("https://finance.yahoo.com/news/x.html")));
        assert!(!p.matches(&url("https://finance.yahoo.com/quote/AMZN")));
    }

    #[test]
    fn test_question_mark_matches_one_char() {
        let p = UrlPattern::new("/page?").unwrap();
        assert!(p.matches(&url("https://example.com/page1")));
        assert!(!p.matches(&url("https://example.com/page12")));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let p = UrlPattern::new("/a.b/(c)").unwrap();
        assert!(p.matches(&url("https://example.com/a.b/(c)")));
        assert!(!p.matches(&url("https://example.com/axb/(c)")));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(
            UrlPattern::new("  "),
            Err(UrlError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_empty_set_matches_everything() {
        assert!(matches_any_pattern(&[], &url("https://example.com/x")));
        let set = compile_patterns(&["/a/*", "/b/*"]).unwrap();
        assert!(matches_any_pattern(&set, &url("https://example.com/b/1")));
        assert!(!matches_any_pattern(&set, &url("https://example.com/c/1")));
    }
}
