//! Per-URL structured extraction
//!
//! Each URL is fetched and extracted on its own. A failed load or an
//! unreadable payload marks that URL's [`CrawlOutcome`] as failed and the
//! batch carries on; only successful outcomes contribute records.

use crate::browser::{page_text, BrowserDriver, RunConfig};
use crate::extractor::{ArticleRecord, CssSchema, ExtractionError, FieldMapping};
use crate::llm::{infer_css_schema, strip_code_fences, TextGenerator};
use crate::sanitizer::DatetimeNormalizer;
use crate::{FinsightError, Result};
use futures::stream::{self, StreamExt};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;

const LLM_SYSTEM_PROMPT: &str = "You extract structured records from the text of a web page. \
Follow the instruction you are given and reply with a JSON array of objects, one per record, \
using the field names from the instruction. Reply with the JSON array only.";

/// Page text beyond this many characters is not sent to the LLM
const MAX_PAGE_CHARS: usize = 24_000;

/// How page content becomes records
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionStrategy {
    /// A fixed selector map
    Css(CssSchema),
    /// A selector map inferred from a sample page on first use, then reused
    InferredCss { sample_html: String, query: String },
    /// The page text is sent to the LLM along with an instruction
    Llm { instruction: String },
}

impl ExtractionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::InferredCss { .. } => "inferred-css",
            Self::Llm { .. } => "llm",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Concurrency {
    #[default]
    Sequential,
    /// At most this many pages in flight
    Parallel(usize),
}

impl Concurrency {
    /// `Sequential` for a limit of 0 or 1
    pub fn from_limit(limit: usize) -> Self {
        if limit <= 1 {
            Self::Sequential
        } else {
            Self::Parallel(limit)
        }
    }
}

/// Result of one URL
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlOutcome {
    pub url: String,
    pub success: bool,
    pub error_message: Option<String>,
    pub status_code: Option<u16>,
    /// Records of a successful page, each stamped with `url`
    pub extracted_content: Option<Vec<Map<String, Value>>>,
}

impl CrawlOutcome {
    fn failed(url: &str, status_code: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            success: false,
            error_message: Some(message.into()),
            status_code,
            extracted_content: None,
        }
    }
}

/// The strategy with any inferred schema resolved
enum Plan<'a> {
    Css(&'a CssSchema),
    Llm {
        instruction: &'a str,
        generator: &'a dyn TextGenerator,
    },
}

/// Fetches article pages and extracts records from them
pub struct StructuredExtractor {
    driver: Arc<dyn BrowserDriver>,
    strategy: ExtractionStrategy,
    llm: Option<Arc<dyn TextGenerator>>,
    concurrency: Concurrency,
    run_config: RunConfig,
    inferred: OnceCell<CssSchema>,
}

impl StructuredExtractor {
    /// Creates an extractor for one strategy
    ///
    /// Pages are awaited with `css:body` and checked against robots.txt
    /// unless [`with_run_config`](Self::with_run_config) says otherwise.
    ///
    /// # Arguments
    ///
    /// * `driver` - Browser used for every article page
    /// * `strategy` - How records are read from a loaded page
    pub fn new(driver: Arc<dyn BrowserDriver>, strategy: ExtractionStrategy) -> Self {
        Self {
            driver,
            strategy,
            llm: None,
            concurrency: Concurrency::Sequential,
            run_config: RunConfig::default()
                .with_wait_for("css:body")
                .with_robots_check(true),
            inferred: OnceCell::new(),
        }
    }

    /// The generator used by LLM-backed strategies
    pub fn with_llm(mut self, llm: Arc<dyn TextGenerator>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_run_config(mut self, run_config: RunConfig) -> Self {
        self.run_config = run_config;
        self
    }

    pub fn strategy(&self) -> &ExtractionStrategy {
        &self.strategy
    }

    /// Fetches and extracts every URL, one outcome per URL
    ///
    /// With [`Concurrency::Parallel`] outcomes arrive in completion order and
    /// pages load without a session.
    ///
    /// # Arguments
    ///
    /// * `urls` - Article pages to fetch, in the order they should be tried
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<CrawlOutcome>)` - One outcome per URL, failed pages included
    /// * `Err(FinsightError)` - If the strategy cannot run at all
    ///
    /// # Errors
    ///
    /// Only configuration problems are raised: an LLM-backed strategy without
    /// a generator, or a schema that cannot be inferred.
    pub async fn crawl(&self, urls: &[String]) -> Result<Vec<CrawlOutcome>> {
        let plan = self.plan().await?;

        let outcomes = match self.concurrency {
            Concurrency::Sequential => {
                let mut outcomes = Vec::with_capacity(urls.len());
                for url in urls {
                    outcomes.push(self.crawl_one(url, &self.run_config, &plan).await);
                }
                outcomes
            }
            Concurrency::Parallel(limit) => {
                let config = self.run_config.clone().without_session();
                stream::iter(urls)
                    .map(|url| self.crawl_one(url, &config, &plan))
                    .buffer_unordered(limit.max(1))
                    .collect()
                    .await
            }
        };

        let failed = outcomes.iter().filter(|o| !o.success).count();
        tracing::info!(
            requested = urls.len(),
            succeeded = outcomes.len() - failed,
            failed,
            "Structured extraction finished"
        );
        Ok(outcomes)
    }

    /// Records from every successful page
    ///
    /// Each record carries the requested URL under `url`. Failed pages
    /// contribute nothing.
    ///
    /// # Arguments
    ///
    /// * `urls` - Article pages to fetch
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Map<String, Value>>)` - Flattened records, possibly fewer than `urls`
    /// * `Err(FinsightError)` - Same conditions as [`crawl`](Self::crawl)
    pub async fn extract(&self, urls: &[String]) -> Result<Vec<Map<String, Value>>> {
        let outcomes = self.crawl(urls).await?;
        Ok(outcomes
            .into_iter()
            .filter(|outcome| outcome.success)
            .filter_map(|outcome| outcome.extracted_content)
            .flatten()
            .collect())
    }

    /// Records converted into [`ArticleRecord`]s
    ///
    /// When `normalizer` is given, each record's raw date is normalized into
    /// `published_at`.
    ///
    /// # Arguments
    ///
    /// * `urls` - Article pages to fetch
    /// * `mapping` - Which record fields feed the title, date and body
    /// * `normalizer` - Date normalizer; `None` leaves dates raw
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ArticleRecord>)` - One article per extracted record
    /// * `Err(FinsightError)` - Same conditions as [`crawl`](Self::crawl)
    pub async fn extract_articles(
        &self,
        urls: &[String],
        mapping: &FieldMapping,
        normalizer: Option<&DatetimeNormalizer>,
    ) -> Result<Vec<ArticleRecord>> {
        let records = self.extract(urls).await?;
        let mut articles = Vec::with_capacity(records.len());
        for record in records {
            let url = record
                .get("url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            articles.push(ArticleRecord::from_record(&url, record, mapping, normalizer).await);
        }
        Ok(articles)
    }

    async fn plan(&self) -> Result<Plan<'_>> {
        match &self.strategy {
            ExtractionStrategy::Css(schema) => Ok(Plan::Css(schema)),
            ExtractionStrategy::InferredCss { sample_html, query } => {
                let generator = self.generator()?;
                let schema = self
                    .inferred
                    .get_or_try_init(|| infer_css_schema(generator, sample_html, query))
                    .await?;
                Ok(Plan::Css(schema))
            }
            ExtractionStrategy::Llm { instruction } => Ok(Plan::Llm {
                instruction,
                generator: self.generator()?,
            }),
        }
    }

    fn generator(&self) -> Result<&dyn TextGenerator> {
        self.llm.as_deref().ok_or_else(|| {
            FinsightError::InvalidConfiguration(
                "LLM-backed extraction needs a text generator".to_string(),
            )
        })
    }

    async fn crawl_one(&self, url: &str, config: &RunConfig, plan: &Plan<'_>) -> CrawlOutcome {
        let page = self.driver.load(url, config).await;
        if !page.success {
            let message = page
                .error_message
                .unwrap_or_else(|| "unknown error".to_string());
            tracing::warn!(url = %url, error = %message, "Article page failed to load");
            return CrawlOutcome::failed(url, page.status_code, message);
        }

        let records = match plan {
            Plan::Css(schema) => schema.apply(&page.html),
            Plan::Llm {
                instruction,
                generator,
            } => extract_with_llm(*generator, instruction, url, &page.html).await,
        };

        match records {
            Ok(mut records) => {
                for record in &mut records {
                    record.insert("url".to_string(), Value::String(url.to_string()));
                }
                tracing::debug!(url = %url, records = records.len(), "Extracted page");
                CrawlOutcome {
                    url: url.to_string(),
                    success: true,
                    error_message: None,
                    status_code: page.status_code,
                    extracted_content: Some(records),
                }
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Extraction failed");
                CrawlOutcome::failed(url, page.status_code, e.to_string())
            }
        }
    }
}

impl fmt::Debug for StructuredExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredExtractor")
            .field("strategy", &self.strategy)
            .field("concurrency", &self.concurrency)
            .field("has_llm", &self.llm.is_some())
            .finish_non_exhaustive()
    }
}

async fn extract_with_llm(
    generator: &dyn TextGenerator,
    instruction: &str,
    url: &str,
    html: &str,
) -> std::result::Result<Vec<Map<String, Value>>, ExtractionError> {
    let text: String = page_text(html).chars().take(MAX_PAGE_CHARS).collect();
    let user_prompt = format!(
        "Instruction:\n{}\n\nURL: {}\n\nPage text:\n{}",
        instruction.trim(),
        url,
        text
    );
    let reply = generator
        .generate_response(LLM_SYSTEM_PROMPT, &user_prompt)
        .await?;
    parse_records(&reply)
}

/// Reads a reply as a JSON array of objects
fn parse_records(reply: &str) -> std::result::Result<Vec<Map<String, Value>>, ExtractionError> {
    let value: Value = serde_json::from_str(strip_code_fences(reply))
        .map_err(|e| ExtractionError::Parse(e.to_string()))?;
    let Value::Array(items) = value else {
        return Err(ExtractionError::Parse("expected a JSON array".to_string()));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Object(record) => Ok(record),
            other => Err(ExtractionError::Parse(format!(
                "expected an object, found {}",
                other
            ))),
        })
        .collect()
}
