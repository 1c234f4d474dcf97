//! Behavioral guarantees checked through the public API

use async_trait::async_trait;
use finsight_crawl::browser::{BrowserDriver, Link, PageLinks, PageResult, RunConfig, Session};
use finsight_crawl::explore::{
    Clock, DeepExploration, FilterConfig, ManualClock, ScrollExploration,
};
use finsight_crawl::extractor::{CssField, CssSchema, ExtractionStrategy, StructuredExtractor};
use finsight_crawl::sanitizer::{DatetimeNormalizer, SanitizerChain, UrlSanitizer};
use finsight_crawl::FinsightError;
use futures::StreamExt;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

fn some(urls: &[&str]) -> Vec<Option<String>> {
    urls.iter().map(|u| Some(u.to_string())).collect()
}

#[test]
fn test_sanitized_output_is_clean() {
    let chain = SanitizerChain::for_article_prefix("https://a.com/news/");
    let raw = vec![
        None,
        Some(String::new()),
        Some("   ".to_string()),
        Some("https://a.com/news/x?y=1".to_string()),
        Some("https://b.com/news/x".to_string()),
        Some("https://a.com/markets/y".to_string()),
        Some("https://a.com/news/z".to_string()),
    ];

    for dedupe in [true, false] {
        let out = chain.sanitize(raw.clone(), dedupe);
        assert_eq!(out, vec!["https://a.com/news/x", "https://a.com/news/z"]);
        assert!(out
            .iter()
            .all(|u| !u.trim().is_empty() && u.starts_with("https://a.com/news/")));
    }
}

#[test]
fn test_chain_order_matters() {
    let chain = SanitizerChain::new(vec![
        UrlSanitizer::StripQuery,
        UrlSanitizer::Prefix("https://a.com/news/".to_string()),
    ])
    .unwrap();
    assert_eq!(
        chain.sanitize_url(Some("https://a.com/news/x?y=1")),
        Some("https://a.com/news/x".to_string())
    );
    assert_eq!(chain.sanitize_url(Some("https://b.com/x")), None);

    // Filtering on an exact URL before the query is stripped rejects it
    let reversed = SanitizerChain::new(vec![
        UrlSanitizer::Prefix("https://a.com/news/x?".to_string()),
        UrlSanitizer::StripQuery,
    ])
    .unwrap();
    assert_eq!(
        reversed.sanitize_url(Some("https://a.com/news/x?y=1")),
        Some("https://a.com/news/x".to_string())
    );
    assert_eq!(reversed.sanitize_url(Some("https://a.com/news/x")), None);
}

#[test]
fn test_dedupe_flag() {
    let chain = SanitizerChain::new(vec![UrlSanitizer::RejectEmpty]).unwrap();
    let raw = some(&["u1", "u1", "u2"]);

    let deduped: HashSet<_> = chain.sanitize(raw.clone(), true).into_iter().collect();
    assert_eq!(deduped, HashSet::from(["u1".to_string(), "u2".to_string()]));
    assert_eq!(chain.sanitize(raw, false), vec!["u1", "u1", "u2"]);
}

#[test]
fn test_sanitizing_is_idempotent() {
    let chain = SanitizerChain::for_article_prefix("https://a.com/news/");
    let once = chain.sanitize(
        some(&["https://a.com/news/1?x", "https://a.com/news/2", "https://a.com/news/1"]),
        true,
    );
    let twice = chain.sanitize(once.iter().cloned().map(Some), true);
    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_datetime_normalizer() {
    let normalizer = DatetimeNormalizer::standard();
    let parsed = normalizer
        .normalize("Sat, April 19, 2025 at 9:30 AM GMT-4")
        .await
        .unwrap();
    assert_eq!(parsed.date_naive(), chrono::NaiveDate::from_ymd_opt(2025, 4, 19).unwrap());
    assert_eq!(parsed.to_rfc3339(), "2025-04-19T09:30:00-04:00");

    let err = normalizer.normalize("the day before yesterday").await.unwrap_err();
    assert!(matches!(err, FinsightError::UnparseableDate { value } if value == "the day before yesterday"));
}

/// A complete `fanout`-ary tree of pages rooted at `/`
struct TreeSite {
    fanout: usize,
}

impl TreeSite {
    fn depth_of(url: &str) -> u32 {
        url.trim_start_matches("https://tree.com/")
            .split('/')
            .filter(|s| !s.is_empty())
            .count() as u32
    }
}

#[async_trait]
impl BrowserDriver for TreeSite {
    async fn load(&self, url: &str, _config: &RunConfig) -> PageResult {
        let base = url.trim_end_matches('/');
        let internal = (0..self.fanout)
            .map(|n| Link {
                href: format!("{}/{}", base, n),
                text: String::new(),
            })
            .collect();
        PageResult {
            url: url.to_string(),
            success: true,
            status_code: Some(200),
            links: PageLinks {
                internal,
                external: Vec::new(),
            },
            ..PageResult::default()
        }
    }

    async fn close_session(&self, _session_id: &str) {}
}

#[tokio::test]
async fn test_deep_bounds_hold_on_any_graph() {
    for (fanout, max_depth, max_pages) in [(1, 5, 3), (3, 2, 100), (5, 3, 20), (8, 0, 10)] {
        let site = TreeSite { fanout };
        let deep = DeepExploration::new(FilterConfig::new(max_depth, max_pages));
        let visits: Vec<_> = deep
            .stream(&site, "https://tree.com/", &RunConfig::default())
            .collect()
            .await;

        assert!(visits.len() <= max_pages);
        assert!(!visits.is_empty());
        assert_eq!(visits[0].requested_url, "https://tree.com/");
        for visit in &visits {
            assert!(visit.depth <= max_depth);
            assert_eq!(TreeSite::depth_of(&visit.requested_url), visit.depth);
        }

        let distinct: HashSet<_> = visits.iter().map(|v| v.requested_url.clone()).collect();
        assert_eq!(distinct.len(), visits.len(), "a page was visited twice");
    }
}

/// A scroll target whose every action takes simulated time
struct SlowFeed {
    clock: Arc<ManualClock>,
    action_time: Duration,
}

#[async_trait]
impl BrowserDriver for SlowFeed {
    async fn load(&self, url: &str, _config: &RunConfig) -> PageResult {
        self.clock.advance(self.action_time);
        PageResult {
            url: url.to_string(),
            success: true,
            ..PageResult::default()
        }
    }

    async fn close_session(&self, _session_id: &str) {}
}

#[tokio::test]
async fn test_scroll_stays_within_one_interval_of_budget() {
    let duration = Duration::from_secs(5);
    let interval = Duration::from_millis(700);
    for action_ms in [0, 10, 250] {
        let clock = Arc::new(ManualClock::new());
        let feed = SlowFeed {
            clock: clock.clone(),
            action_time: Duration::from_millis(action_ms),
        };
        let scroll = ScrollExploration::new(duration, interval).with_clock(clock.clone());

        let start = clock.now();
        scroll
            .explore(&feed, &Session::new("s"), "https://a.com/feed", &RunConfig::default())
            .await;
        let spent = clock.now() - start;

        assert!(spent >= duration);
        assert!(
            spent <= duration + interval + Duration::from_millis(action_ms),
            "spent {:?} with {}ms actions",
            spent,
            action_ms
        );
    }
}

/// Serves a story per URL, failing the ones listed
struct Newsroom {
    failing: HashSet<String>,
}

#[async_trait]
impl BrowserDriver for Newsroom {
    async fn load(&self, url: &str, _config: &RunConfig) -> PageResult {
        if self.failing.contains(url) {
            return PageResult::failure(url, "timed out").with_status(504);
        }
        PageResult {
            url: url.to_string(),
            success: true,
            html: format!("<article><h1>{}</h1></article>", url),
            ..PageResult::default()
        }
    }

    async fn close_session(&self, _session_id: &str) {}
}

#[tokio::test]
async fn test_one_failed_page_does_not_sink_the_batch() {
    let urls: Vec<String> = (1..=3).map(|n| format!("https://a.com/news/{}", n)).collect();
    let driver = Arc::new(Newsroom {
        failing: HashSet::from([urls[1].clone()]),
    });
    let schema = CssSchema {
        name: "Story".to_string(),
        base_selector: "article".to_string(),
        fields: vec![CssField::text("title", "h1")],
    };
    let extractor = StructuredExtractor::new(driver, ExtractionStrategy::Css(schema));

    let records = extractor.extract(&urls).await.unwrap();
    let sources: Vec<_> = records
        .iter()
        .map(|r| r["url"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(sources, vec![urls[0].clone(), urls[2].clone()]);

    let outcomes: HashMap<_, _> = extractor
        .crawl(&urls)
        .await
        .unwrap()
        .into_iter()
        .map(|o| (o.url.clone(), o))
        .collect();
    assert!(!outcomes[&urls[1]].success);
    assert_eq!(outcomes[&urls[1]].status_code, Some(504));
}
