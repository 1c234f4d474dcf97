//! End-to-end pipeline runs, from seed page to stored articles

use async_trait::async_trait;
use finsight_crawl::browser::{
    build_page_result, BrowserDriver, HttpBrowser, Link, PageLinks, PageResult, RunConfig,
};
use finsight_crawl::config::{parse_config, yahoo_finance, DeepConfig};
use finsight_crawl::explore::ManualClock;
use finsight_crawl::pipeline::{NewsPipeline, RunOverrides, SiteProfile};
use finsight_crawl::storage::{ArticleStore, RunStatus, SqliteArticleStore};
use finsight_crawl::FinsightError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_string(format!("<html><body>{}</body></html>", body))
}

fn story(title: &str, date: &str) -> String {
    format!(
        r#"<article><h1>{}</h1><time>{}</time><div class="body">Stocks rose on the news.</div>
           <span class="ticker">SPY</span></article>"#,
        title, date
    )
}

fn deep_config(server_uri: &str, db_path: &str) -> String {
    format!(
        r#"
[browser]
driver = "http"

[user-agent]
crawler-name = "FinsightBot"
crawler-version = "0.1.0"
contact-url = "https://example.com/bot"
contact-email = "desk@example.com"

[storage]
database-path = "{db}"

[[profile]]
name = "wire"
seed-url = "{uri}/news"
article-prefix = "{uri}/news/"

[profile.deep]
max-depth = 1
max-pages = 10

[profile.schema]
name = "Story"
base-selector = "article"
fields = [
    {{ name = "title", selector = "h1" }},
    {{ name = "date", selector = "time" }},
    {{ name = "body", selector = "div.body" }},
    {{ name = "ticker", selector = "span.ticker" }},
]
"#,
        uri = server_uri,
        db = db_path
    )
}

#[tokio::test]
async fn test_deep_profile_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /news/b.html\n"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(page(
            r#"<a href="/news/a.html?src=feed">A</a>
               <a href="/news/b.html">B</a>
               <a href="/news/missing.html">Missing</a>
               <a href="/about">About</a>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/a.html"))
        .respond_with(page(&story(
            "Fed holds rates",
            "Sat, April 19, 2025 at 9:30 AM GMT-4",
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news/b.html"))
        .respond_with(page(&story("Blocked story", "Sun, Apr 20, 2025, 11:24 AM")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(page("<p>About us</p>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("articles.db");
    let config = parse_config(&deep_config(&server.uri(), &db_path.to_string_lossy())).unwrap();
    let profile = SiteProfile::from_config(&config.find_profile("wire").unwrap()).unwrap();

    let driver = Arc::new(HttpBrowser::new(&config.user_agent, Duration::from_secs(5)).unwrap());
    let pipeline = NewsPipeline::new(driver);
    let overrides = RunOverrides {
        max_articles: Some(5),
        ..RunOverrides::default()
    };
    let report = pipeline.run(&profile, &overrides).await.unwrap();

    // a.html and b.html survive sanitizing; b.html is then refused by robots.txt
    assert_eq!(report.discovered, 2);
    assert_eq!(report.requested, 5);
    assert_eq!(report.obtained(), 1);
    assert!(report.is_partial());

    let article = &report.articles[0];
    assert_eq!(article.url, format!("{}/news/a.html", server.uri()));
    assert_eq!(article.title.as_deref(), Some("Fed holds rates"));
    assert_eq!(article.body.as_deref(), Some("Stocks rose on the news."));
    assert_eq!(
        article.published_date(),
        chrono::NaiveDate::from_ymd_opt(2025, 4, 19)
    );
    assert_eq!(article.extra.get("ticker").and_then(|v| v.as_str()), Some("SPY"));

    let mut store = SqliteArticleStore::new(&db_path).unwrap();
    let run_id = store.create_run(&report.profile, "hash").unwrap();
    let written = store
        .upsert_articles("NewsExample", Some(run_id), &report.articles)
        .unwrap();
    store
        .complete_run(run_id, RunStatus::Partial, report.requested, report.obtained())
        .unwrap();

    assert_eq!(written, 1);
    assert_eq!(store.count_articles("NewsExample").unwrap(), 1);
    let run = store.get_run(run_id).unwrap();
    assert_eq!(run.status, RunStatus::Partial);
    assert_eq!(run.obtained, Some(1));
}

/// A feed that reveals one more story per scroll and serves Yahoo-shaped articles
#[derive(Default)]
struct FeedSite {
    scrolls: Mutex<usize>,
    closed: Mutex<Vec<String>>,
    fail_seed: bool,
}

const FEED: &str = "https://finance.yahoo.com/news";

#[async_trait]
impl BrowserDriver for FeedSite {
    async fn load(&self, url: &str, config: &RunConfig) -> PageResult {
        if url == FEED {
            if self.fail_seed {
                return PageResult::failure(url, "net::ERR_CONNECTION_RESET");
            }
            let revealed = if config.js_only {
                let mut scrolls = self.scrolls.lock().unwrap();
                *scrolls += 1;
                *scrolls
            } else {
                0
            };
            let mut internal: Vec<Link> = (0..=revealed)
                .map(|n| Link {
                    href: format!("{}/story-{}.html?.tsrc=fin-srch", FEED, n),
                    text: format!("Story {}", n),
                })
                .collect();
            internal.push(Link {
                href: "https://finance.yahoo.com/quote/SPY".to_string(),
                text: "SPY".to_string(),
            });
            return PageResult {
                url: url.to_string(),
                success: true,
                status_code: Some(200),
                links: PageLinks {
                    internal,
                    external: Vec::new(),
                },
                ..PageResult::default()
            };
        }

        let html = format!(
            r#"<div class="article-wrap">
                 <div class="cover-title">Headline for {url}</div>
                 <time class="byline-attr-meta-time" datetime="2025-04-20T15:24:00Z">Sun, Apr 20, 2025, 11:24 AM</time>
                 <div class="byline-attr-author">Markets Desk</div>
                 <div class="body">Body text.</div>
               </div>"#
        );
        PageResult {
            url: url.to_string(),
            success: true,
            status_code: Some(200),
            html,
            ..PageResult::default()
        }
    }

    async fn close_session(&self, session_id: &str) {
        self.closed.lock().unwrap().push(session_id.to_string());
    }
}

#[tokio::test]
async fn test_scroll_profile_with_simulated_time() {
    let site = Arc::new(FeedSite::default());
    let clock = Arc::new(ManualClock::new());
    let pipeline = NewsPipeline::new(site.clone()).with_clock(clock.clone());

    let profile = SiteProfile::from_config(&yahoo_finance()).unwrap();
    let overrides = RunOverrides {
        duration: Some(Duration::from_secs(3)),
        scroll_interval: Some(Duration::from_secs(1)),
        max_articles: Some(2),
    };
    let report = pipeline.run(&profile, &overrides).await.unwrap();

    assert_eq!(*site.scrolls.lock().unwrap(), 3);
    assert_eq!(clock.elapsed(), Duration::from_secs(3));
    // story-0 ..= story-3 after dedupe; the quote page fails the prefix
    assert_eq!(report.discovered, 4);
    assert_eq!(report.requested, 2);
    assert!(!report.is_partial());

    let urls: Vec<_> = report.articles.iter().map(|a| a.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://finance.yahoo.com/news/story-0.html",
            "https://finance.yahoo.com/news/story-1.html"
        ]
    );
    let first = &report.articles[0];
    assert_eq!(
        first.published_date(),
        chrono::NaiveDate::from_ymd_opt(2025, 4, 20)
    );
    assert_eq!(
        first.extra.get("author").and_then(|v| v.as_str()),
        Some("Markets Desk")
    );
    assert_eq!(site.closed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_seed_failure_aborts_and_releases_session() {
    let site = Arc::new(FeedSite {
        fail_seed: true,
        ..FeedSite::default()
    });
    let pipeline = NewsPipeline::new(site.clone()).with_clock(Arc::new(ManualClock::new()));
    let profile = SiteProfile::from_config(&yahoo_finance()).unwrap();

    let err = pipeline
        .run(&profile, &RunOverrides::default())
        .await
        .unwrap_err();

    match err {
        FinsightError::PageLoad { url, message } => {
            assert_eq!(url, FEED);
            assert!(message.contains("CONNECTION_RESET"));
        }
        other => panic!("expected a page load error, got {other:?}"),
    }
    assert_eq!(site.closed.lock().unwrap().len(), 1);
    assert_eq!(*site.scrolls.lock().unwrap(), 0);
}

/// Two sites whose pages are shaped by the same code path as the real drivers
struct SyndicatedSites {
    loads: Mutex<Vec<String>>,
}

const HUB: &str = "https://a.com/news";
const SYNDICATED: &str = "https://b.com/news/x.html";

#[async_trait]
impl BrowserDriver for SyndicatedSites {
    async fn load(&self, url: &str, config: &RunConfig) -> PageResult {
        self.loads.lock().unwrap().push(url.to_string());
        let html = match url {
            HUB => format!(r#"<html><body><a href="{SYNDICATED}">Partner story</a></body></html>"#),
            SYNDICATED => r#"<html><body><div class="article-wrap">
                   <div class="cover-title">Partner story</div>
                   <div class="body">Syndicated text.</div>
                 </div></body></html>"#
                .to_string(),
            _ => return PageResult::failure(url, "HTTP 404").with_status(404),
        };
        build_page_result(url, Some(200), &html, config)
    }

    async fn close_session(&self, _session_id: &str) {}
}

#[tokio::test]
async fn test_deep_profile_can_follow_external_links() {
    let mut config = yahoo_finance();
    config.name = "syndication".to_string();
    config.seed_url = HUB.to_string();
    config.article_prefix = "https://b.com/news/".to_string();
    config.deep = Some(DeepConfig {
        max_depth: 1,
        max_pages: 5,
        allowed_domains: vec!["a.com".to_string(), "b.com".to_string()],
        url_patterns: vec![],
        keywords: vec![],
        include_external: true,
    });
    let profile = SiteProfile::from_config(&config).unwrap();

    let sites = Arc::new(SyndicatedSites {
        loads: Mutex::new(Vec::new()),
    });
    let report = NewsPipeline::new(sites.clone())
        .run(&profile, &RunOverrides::default())
        .await
        .unwrap();

    assert!(sites.loads.lock().unwrap().iter().any(|u| u == SYNDICATED));
    assert_eq!(report.discovered, 1);
    assert_eq!(report.obtained(), 1);
    assert_eq!(report.articles[0].url, SYNDICATED);
    assert_eq!(report.articles[0].title.as_deref(), Some("Partner story"));

    // The same profile without external following stays on a.com
    config.deep.as_mut().unwrap().include_external = false;
    let profile = SiteProfile::from_config(&config).unwrap();
    let report = NewsPipeline::new(sites.clone())
        .run(&profile, &RunOverrides::default())
        .await
        .unwrap();
    assert_eq!(report.discovered, 0);
}
