//! Site-specific orchestration
//!
//! [`NewsPipeline::run`] turns a [`SiteProfile`] into article records:
//!
//! 1. Load the seed page and discover links (scroll, or a deep crawl when
//!    the profile has one)
//! 2. Sanitize with the profile's article prefix
//! 3. Cap the URL list at `max_articles`
//! 4. Fetch and extract each article, normalizing dates
//!
//! Pages that fail are skipped, so a report may hold fewer articles than
//! were requested.

use crate::browser::{BrowserDriver, RunConfig};
use crate::config::ProfileConfig;
use crate::explore::{Clock, DeepExploration, ExplorationStrategy, ScrollExploration, TokioClock};
use crate::extractor::{
    ArticleRecord, Concurrency, ExtractionStrategy, FieldMapping, StructuredExtractor, UrlExtractor,
};
use crate::llm::TextGenerator;
use crate::sanitizer::{DatetimeNormalizer, SanitizerChain};
use crate::{FinsightError, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A profile resolved into runnable strategies
#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub name: String,
    pub seed_url: String,
    pub article_prefix: String,
    pub max_articles: usize,
    pub duration: Duration,
    pub scroll_interval: Duration,
    pub excluded_tags: Vec<String>,
    pub wait_for: Option<String>,
    /// Replaces scroll discovery when set
    pub deep: Option<DeepExploration>,
    pub extraction: ExtractionStrategy,
    pub fields: FieldMapping,
}

impl SiteProfile {
    /// Resolves a configured profile
    ///
    /// An inferred schema's sample page is read from disk here.
    ///
    /// # Arguments
    ///
    /// * `config` - A `[[profile]]` entry or a built-in profile
    ///
    /// # Returns
    ///
    /// * `Ok(SiteProfile)` - Profile with its strategies built
    /// * `Err(FinsightError)` - If no extraction strategy is set, a URL pattern
    ///   is invalid, or the sample page cannot be read
    pub fn from_config(config: &ProfileConfig) -> Result<Self> {
        let extraction = match (&config.schema, &config.infer_schema, &config.llm_instruction) {
            (Some(schema), _, _) => ExtractionStrategy::Css(schema.clone()),
            (None, Some(infer), _) => ExtractionStrategy::InferredCss {
                sample_html: std::fs::read_to_string(Path::new(&infer.sample_html_path))?,
                query: infer.query.clone(),
            },
            (None, None, Some(instruction)) => ExtractionStrategy::Llm {
                instruction: instruction.clone(),
            },
            (None, None, None) => {
                return Err(FinsightError::InvalidConfiguration(format!(
                    "profile '{}' has no extraction strategy",
                    config.name
                )))
            }
        };

        let deep = config
            .deep
            .as_ref()
            .map(DeepExploration::from_config)
            .transpose()?;

        Ok(Self {
            name: config.name.clone(),
            seed_url: config.seed_url.clone(),
            article_prefix: config.article_prefix.clone(),
            max_articles: config.max_articles,
            duration: Duration::from_secs(config.duration_seconds),
            scroll_interval: Duration::from_millis(config.scroll_interval_ms),
            excluded_tags: config.excluded_tags.clone(),
            wait_for: config.wait_for.clone(),
            deep,
            extraction,
            fields: config.fields.clone(),
        })
    }
}

/// Per-run replacements for profile settings
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub duration: Option<Duration>,
    pub scroll_interval: Option<Duration>,
    pub max_articles: Option<usize>,
}

/// What one run produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub profile: String,
    /// The article cap in effect
    pub requested: usize,
    /// Sanitized URLs before the cap
    pub discovered: usize,
    pub articles: Vec<ArticleRecord>,
}

impl PipelineReport {
    pub fn obtained(&self) -> usize {
        self.articles.len()
    }

    /// True when fewer articles came back than were requested
    pub fn is_partial(&self) -> bool {
        self.obtained() < self.requested
    }
}

/// End-to-end "extract N articles from site X"
pub struct NewsPipeline {
    driver: Arc<dyn BrowserDriver>,
    llm: Option<Arc<dyn TextGenerator>>,
    clock: Arc<dyn Clock>,
    concurrency: Concurrency,
    dedupe: bool,
}

impl NewsPipeline {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self {
            driver,
            llm: None,
            clock: Arc::new(TokioClock),
            concurrency: Concurrency::Sequential,
            dedupe: true,
        }
    }

    /// Enables LLM-backed extraction and the natural-language date fallback
    pub fn with_llm(mut self, llm: Arc<dyn TextGenerator>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    /// Runs discovery and extraction for one profile
    ///
    /// The discovery session is closed whether or not the seed loads.
    ///
    /// # Arguments
    ///
    /// * `profile` - Site to crawl
    /// * `overrides` - Per-run replacements for the profile's budgets
    ///
    /// # Returns
    ///
    /// * `Ok(PipelineReport)` - Articles obtained; may be fewer than requested
    /// * `Err(FinsightError)` - If the seed page fails or extraction cannot start
    pub async fn run(&self, profile: &SiteProfile, overrides: &RunOverrides) -> Result<PipelineReport> {
        let max_articles = overrides.max_articles.unwrap_or(profile.max_articles);
        let strategy = self.discovery(profile, overrides);

        tracing::info!(
            profile = %profile.name,
            seed = %profile.seed_url,
            strategy = strategy.name(),
            max_articles,
            "Pipeline started"
        );

        let discovery_config = RunConfig::default()
            .with_excluded_tags(profile.excluded_tags.iter().cloned())
            .with_external_links_excluded(true);
        let url_extractor = UrlExtractor::new(self.driver.clone())
            .with_run_config(discovery_config)
            .with_dedupe(self.dedupe);
        let chain = SanitizerChain::for_article_prefix(&profile.article_prefix);

        let discovered = url_extractor
            .extract(&profile.seed_url, &strategy, &chain)
            .await;
        url_extractor.close().await;
        let mut urls = discovered?;

        let discovered = urls.len();
        urls.truncate(max_articles);
        tracing::info!(discovered, selected = urls.len(), "Article URLs selected");

        let article_config = RunConfig::default()
            .with_wait_for(profile.wait_for.as_deref().unwrap_or("css:body"))
            .with_excluded_tags(profile.excluded_tags.iter().cloned())
            .with_robots_check(true);
        let mut extractor = StructuredExtractor::new(self.driver.clone(), profile.extraction.clone())
            .with_concurrency(self.concurrency)
            .with_run_config(article_config);
        let normalizer = match &self.llm {
            Some(llm) => {
                extractor = extractor.with_llm(llm.clone());
                DatetimeNormalizer::with_fallback(llm.clone())
            }
            None => DatetimeNormalizer::standard(),
        };

        let articles = extractor
            .extract_articles(&urls, &profile.fields, Some(&normalizer))
            .await?;

        let report = PipelineReport {
            profile: profile.name.clone(),
            requested: max_articles,
            discovered,
            articles,
        };
        if report.is_partial() {
            tracing::info!(
                requested = report.requested,
                obtained = report.obtained(),
                "Fewer articles than requested"
            );
        }
        tracing::info!(profile = %profile.name, articles = report.obtained(), "Pipeline finished");
        Ok(report)
    }

    fn discovery(&self, profile: &SiteProfile, overrides: &RunOverrides) -> ExplorationStrategy {
        match &profile.deep {
            Some(deep) => ExplorationStrategy::Deep(deep.clone()),
            None => ScrollExploration::new(
                overrides.duration.unwrap_or(profile.duration),
                overrides.scroll_interval.unwrap_or(profile.scroll_interval),
            )
            .with_clock(self.clock.clone())
            .into(),
        }
    }
}
