//! HttpBrowser and robots.txt against a mock server

use finsight_crawl::browser::{BrowserDriver, CacheMode, HttpBrowser, RunConfig};
use finsight_crawl::config::UserAgentConfig;
use finsight_crawl::explore::{ExplorationStrategy, ManualClock, ScrollExploration};
use finsight_crawl::extractor::UrlExtractor;
use finsight_crawl::robots::fetch_robots;
use finsight_crawl::sanitizer::SanitizerChain;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "FinsightBot".to_string(),
        crawler_version: "0.1.0".to_string(),
        contact_url: "https://example.com/bot".to_string(),
        contact_email: "desk@example.com".to_string(),
    }
}

fn browser() -> HttpBrowser {
    HttpBrowser::new(&user_agent(), Duration::from_secs(5)).expect("client builds")
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(format!("<html><head><title>T</title></head><body>{}</body></html>", body))
}

#[tokio::test]
async fn test_load_harvests_and_shapes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .and(header_exists("user-agent"))
        .respond_with(html(
            r#"<nav><a href="/markets">Markets</a></nav>
               <a href="/news/fed-holds.html" data-ylk="pos:1">Fed holds</a>
               <a href="https://other.example.org/story">Elsewhere</a>"#,
        ))
        .mount(&server)
        .await;

    let config = RunConfig::default().with_excluded_tags(["nav"]);
    let result = browser().load(&format!("{}/news", server.uri()), &config).await;

    assert!(result.success, "{:?}", result.error_message);
    assert_eq!(result.status_code, Some(200));
    assert!(!result.html.contains("data-ylk"));
    assert!(!result.html.contains("Markets"));

    let internal: Vec<_> = result.links.internal.iter().map(|l| l.href.as_str()).collect();
    assert_eq!(internal, vec![format!("{}/news/fed-holds.html", server.uri())]);
    assert_eq!(result.links.internal[0].text, "Fed holds");
    assert_eq!(result.links.external.len(), 1);
}

#[tokio::test]
async fn test_http_error_is_a_failed_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = browser()
        .load(&format!("{}/gone", server.uri()), &RunConfig::default())
        .await;
    assert!(!result.success);
    assert_eq!(result.status_code, Some(404));
    assert!(result.error_message.unwrap_or_default().contains("404"));
}

#[tokio::test]
async fn test_unsatisfied_wait_condition_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/story"))
        .respond_with(html("<p>teaser</p>"))
        .mount(&server)
        .await;

    let config = RunConfig::default().with_wait_for("css:div.caas-body");
    let result = browser().load(&format!("{}/story", server.uri()), &config).await;
    assert!(!result.success);
}

#[tokio::test]
async fn test_cache_mode_controls_refetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cached"))
        .respond_with(html("<p>once</p>"))
        .expect(2)
        .mount(&server)
        .await;

    let browser = browser();
    let url = format!("{}/cached", server.uri());
    let cached = RunConfig::default().with_cache_mode(CacheMode::Enabled);

    assert!(browser.load(&url, &cached).await.success);
    assert!(browser.load(&url, &cached).await.success);
    // Bypass always goes to the network
    assert!(browser.load(&url, &RunConfig::default()).await.success);
}

#[tokio::test]
async fn test_robots_disallow_blocks_without_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private/\n"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html("<p>secret</p>"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public/page"))
        .respond_with(html("<p>open</p>"))
        .mount(&server)
        .await;

    let browser = browser();
    let config = RunConfig::default().with_robots_check(true);

    let blocked = browser
        .load(&format!("{}/private/page", server.uri()), &config)
        .await;
    assert!(!blocked.success);
    assert_eq!(blocked.error_message.as_deref(), Some("disallowed by robots.txt"));

    // Second check is answered from the robots cache
    let allowed = browser
        .load(&format!("{}/public/page", server.uri()), &config)
        .await;
    assert!(allowed.success);
}

#[tokio::test]
async fn test_robots_status_handling() {
    let server = MockServer::start().await;
    let client = reqwest::Client::new();

    // No robots.txt mounted: wiremock answers 404
    let missing = fetch_robots(&client, &server.uri()).await;
    assert!(missing.is_allowed(&format!("{}/anything", server.uri()), "FinsightBot"));

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let unavailable = fetch_robots(&client, &server.uri()).await;
    assert!(!unavailable.is_allowed(&format!("{}/anything", server.uri()), "FinsightBot"));
}

#[tokio::test]
async fn test_scroll_discovery_over_static_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(html(
            r#"<a href="/news/rates.html">Rates</a>
               <a href="/news/oil.html?src=feed">Oil</a>
               <a href="/markets">Markets</a>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let extractor = UrlExtractor::new(Arc::new(browser()));
    let scroll: ExplorationStrategy =
        ScrollExploration::new(Duration::from_secs(3), Duration::from_secs(1))
            .with_clock(Arc::new(ManualClock::new()))
            .into();
    let chain = SanitizerChain::for_article_prefix(&format!("{}/news/", server.uri()));

    let urls = extractor
        .extract(&format!("{}/news", server.uri()), &scroll, &chain)
        .await
        .unwrap();
    extractor.close().await;

    assert_eq!(
        urls,
        vec![
            format!("{}/news/rates.html", server.uri()),
            format!("{}/news/oil.html", server.uri())
        ]
    );
}
