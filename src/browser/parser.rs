//! HTML parsing and shaping shared by the browser drivers
//!
//! Link harvesting follows these rules:
//!
//! **Include:**
//! - `<a href="...">` anywhere in the document
//! - `<link rel="canonical" href="...">`
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` and `data:` links
//! - fragment-only links (same-page anchors)
//! - anything that does not resolve to http(s)

use crate::browser::{Link, PageLinks, PageResult, RunConfig};
use crate::url::same_site;
use once_cell::sync::Lazy;
use scraper::{Html, Node, Selector};
use std::collections::HashSet;
use url::Url;

static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));
static CANONICAL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("link[rel='canonical'][href]").expect("canonical selector is valid")
});
static TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("title selector is valid"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("body selector is valid"));

/// Links and title read from one page
#[derive(Debug, Clone)]
pub struct ParsedPage {
    pub title: Option<String>,
    pub links: PageLinks,
}

/// Parses HTML, resolving links against `base_url` and splitting them into
/// same-site and external links
///
/// # Example
///
/// ```
/// use finsight_crawl::browser::parse_page;
/// use url::Url;
///
/// let html = r#"<html><head><title>Markets</title></head>
///     <body><a href="/news/a.html">A</a><a href="https://other.com/">B</a></body></html>"#;
/// let base = Url::parse("https://finance.yahoo.com/news").unwrap();
/// let parsed = parse_page(html, &base);
/// assert_eq!(parsed.title.as_deref(), Some("Markets"));
/// assert_eq!(parsed.links.internal[0].href, "https://finance.yahoo.com/news/a.html");
/// assert_eq!(parsed.links.external.len(), 1);
/// ```
pub fn parse_page(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty());

    let mut links = PageLinks::default();
    let mut seen = HashSet::new();

    let anchors = document
        .select(&ANCHOR)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let text = collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "));
            Some((href, text))
        });
    let canonical = document
        .select(&CANONICAL)
        .filter_map(|element| Some((element.value().attr("href")?, String::new())));

    for (href, text) in anchors.chain(canonical) {
        let Some(resolved) = resolve_link(href, base_url) else {
            continue;
        };
        if !seen.insert(resolved.to_string()) {
            continue;
        }
        let link = Link {
            href: resolved.to_string(),
            text,
        };
        if same_site(&resolved, base_url) {
            links.internal.push(link);
        } else {
            links.external.push(link);
        }
    }

    ParsedPage { title, links }
}

/// Resolves an href to an absolute http(s) URL, or `None` if the link should
/// not be followed
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut url = base_url.join(href).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Applies the content-shaping flags of `config` to raw HTML
///
/// Elements named in `excluded_tags` are removed with their subtrees, and
/// `data-*` attributes are stripped unless `keep_data_attributes` is set.
/// Both happen on the parsed tree, so attribute values and text that merely
/// mention `data-` are left alone.
///
/// # Arguments
///
/// * `html` - The page as fetched
/// * `config` - Load options carrying the shaping flags
///
/// # Returns
///
/// * The re-serialized document, or `html` unchanged when there is nothing to shape
pub fn shape_html(html: &str, config: &RunConfig) -> String {
    let strip_data = !config.keep_data_attributes;
    if config.excluded_tags.is_empty() && !strip_data {
        return html.to_string();
    }

    let mut document = Html::parse_document(html);
    remove_elements(&mut document, &config.excluded_tags);
    if strip_data {
        strip_data_attributes(&mut document);
    }
    document.html()
}

fn remove_elements(document: &mut Html, tags: &[String]) {
    for tag in tags {
        let selector = match Selector::parse(tag) {
            Ok(selector) => selector,
            Err(_) => {
                tracing::warn!(tag = %tag, "Ignoring invalid excluded tag");
                continue;
            }
        };
        let ids: Vec<_> = document.select(&selector).map(|element| element.id()).collect();
        for id in ids {
            if let Some(mut node) = document.tree.get_mut(id) {
                node.detach();
            }
        }
    }
}

fn strip_data_attributes(document: &mut Html) {
    for node in document.tree.values_mut() {
        if let Node::Element(element) = node {
            element.attrs.retain(|name, _| !name.local.starts_with("data-"));
        }
    }
}

/// Visible text of the page body, whitespace-collapsed
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let text = match document.select(&BODY).next() {
        Some(body) => body.text().collect::<Vec<_>>().join(" "),
        None => document.root_element().text().collect::<Vec<_>>().join(" "),
    };
    collapse_whitespace(&text)
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Builds a successful [`PageResult`] from fetched HTML
///
/// Shaping is applied before links are harvested, so links inside excluded
/// elements are not reported.
///
/// # Arguments
///
/// * `final_url` - URL after redirects; relative links resolve against it
/// * `status_code` - HTTP status, when the driver knows it
/// * `raw_html` - The page as fetched
/// * `config` - Load options carrying the shaping and link flags
pub fn build_page_result(
    final_url: &str,
    status_code: Option<u16>,
    raw_html: &str,
    config: &RunConfig,
) -> PageResult {
    let html = shape_html(raw_html, config);
    let mut links = match Url::parse(final_url) {
        Ok(base) => parse_page(&html, &base).links,
        Err(_) => PageLinks::default(),
    };
    if config.exclude_external_links {
        links.external.clear();
    }

    PageResult {
        url: final_url.to_string(),
        success: true,
        status_code,
        error_message: None,
        links,
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://www.example.com/news").unwrap()
    }

    fn hrefs(links: &[Link]) -> Vec<&str> {
        links.iter().map(|l| l.href.as_str()).collect()
    }

    #[test]
    fn test_title_is_trimmed() {
        let parsed = parse_page(
            "<html><head><title>  Market   Wrap </title></head></html>",
            &base_url(),
        );
        assert_eq!(parsed.title.as_deref(), Some("Market Wrap"));
    }

    #[test]
    fn test_relative_links_resolve_and_split_by_site() {
        let html = r#"<body>
            <a href="/news/a.html">A</a>
            <a href="https://example.com/news/b.html">B</a>
            <a href="https://other.com/c">C</a>
        </body>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(
            hrefs(&parsed.links.internal),
            vec![
                "https://www.example.com/news/a.html",
                "https://example.com/news/b.html"
            ]
        );
        assert_eq!(hrefs(&parsed.links.external), vec!["https://other.com/c"]);
    }

    #[test]
    fn test_skipped_link_kinds() {
        let html = r##"<body>
            <a href="javascript:void(0)">js</a>
            <a href="MAILTO:desk@example.com">mail</a>
            <a href="tel:+1">tel</a>
            <a href="data:text/html,x">data</a>
            <a href="#top">top</a>
            <a href="/report.pdf" download>pdf</a>
            <a href="ftp://example.com/file">ftp</a>
            <a href="">empty</a>
        </body>"##;
        let parsed = parse_page(html, &base_url());
        assert!(parsed.links.internal.is_empty());
        assert!(parsed.links.external.is_empty());
    }

    #[test]
    fn test_anchor_text_and_duplicates() {
        let html = r#"<body>
            <a href="/news/a.html">  Fed   holds
                rates </a>
            <a href="/news/a.html#comments">again</a>
        </body>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(parsed.links.internal.len(), 1);
        assert_eq!(parsed.links.internal[0].text, "Fed holds rates");
    }

    #[test]
    fn test_canonical_link_is_harvested() {
        let html = r#"<head><link rel="canonical" href="https://example.com/news/canon.html"></head>"#;
        let parsed = parse_page(html, &base_url());
        assert_eq!(
            hrefs(&parsed.links.internal),
            vec!["https://example.com/news/canon.html"]
        );
    }

    #[test]
    fn test_shape_removes_excluded_tags() {
        let html = r#"<html><body><header><a href="/nav">Nav</a></header>
            <div class="story">Text</div><footer>Foot</footer></body></html>"#;
        let config = RunConfig::default().with_excluded_tags(["header", "footer"]);
        let shaped = shape_html(html, &config);
        assert!(!shaped.contains("Nav"));
        assert!(!shaped.contains("Foot"));
        assert!(shaped.contains("Text"));
    }

    #[test]
    fn test_shape_strips_data_attributes() {
        let html = r#"<div class="a" data-ylk="slk:x;elm:y" data-v9y=1 id="k">data-kept in text</div>"#;
        let shaped = shape_html(html, &RunConfig::default());
        assert!(!shaped.contains("data-ylk"));
        assert!(!shaped.contains("data-v9y"));
        assert!(shaped.contains(r#"class="a""#));
        assert!(shaped.contains(r#"id="k""#));
        assert!(shaped.contains("data-kept in text"));

        let config = RunConfig {
            keep_data_attributes: true,
            ..RunConfig::default()
        };
        assert!(shape_html(html, &config).contains("data-ylk"));
    }

    #[test]
    fn test_data_stripping_leaves_values_alone() {
        let html = r#"<p title="see data-x" data-track="1">a</p><span alt='1 > 0' data-pos="2">b</span>"#;
        let shaped = shape_html(html, &RunConfig::default());
        assert!(shaped.contains(r#"title="see data-x""#), "{shaped}");
        assert!(!shaped.contains("data-track"));
        assert!(!shaped.contains("data-pos"));

        let document = Html::parse_document(&shaped);
        let span = Selector::parse("span").unwrap();
        let span = document.select(&span).next().unwrap();
        assert_eq!(span.value().attr("alt"), Some("1 > 0"));
        assert_eq!(span.text().collect::<String>(), "b");
    }

    #[test]
    fn test_build_page_result_skips_links_in_removed_elements() {
        let html = r#"<html><body><form><a href="/login">Login</a></form>
            <a href="/news/a.html">A</a><a href="https://other.com/">O</a></body></html>"#;
        let config = RunConfig::default()
            .with_excluded_tags(["form"])
            .with_external_links_excluded(true);
        let result = build_page_result("https://example.com/news", Some(200), html, &config);
        assert!(result.success);
        assert_eq!(hrefs(&result.links.internal), vec!["https://example.com/news/a.html"]);
        assert!(result.links.external.is_empty());
    }

    #[test]
    fn test_page_text() {
        let html = "<html><head><title>T</title></head><body><p>One</p>\n<p>Two  three</p></body></html>";
        assert_eq!(page_text(html), "One Two three");
    }
}
