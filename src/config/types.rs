use crate::extractor::{CssSchema, FieldMapping};
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    pub storage: StorageConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default, rename = "profile")]
    pub profiles: Vec<ProfileConfig>,
}

/// Which browser driver performs page loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// A W3C WebDriver endpoint (chromedriver, geckodriver, Selenium)
    #[default]
    Webdriver,
    /// Plain HTTP fetches without script execution
    Http,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserName {
    #[default]
    Chrome,
    Firefox,
}

/// Browser driver configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BrowserSettings {
    #[serde(default)]
    pub driver: DriverKind,

    /// Base URL of the WebDriver server
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub browser_name: BrowserName,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Timeout for a single page load or script call (milliseconds)
    #[serde(default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// How long a `wait_for` condition may take before the load fails (milliseconds)
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            driver: DriverKind::default(),
            webdriver_url: default_webdriver_url(),
            browser_name: BrowserName::default(),
            headless: true,
            page_timeout_ms: default_page_timeout_ms(),
            wait_timeout_ms: default_wait_timeout_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also used as the robots.txt product token
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// OpenAI-compatible text generation endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LlmConfig {
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_llm_attempts")]
    pub max_attempts: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: default_llm_endpoint(),
            model: default_llm_model(),
            api_key_env: default_api_key_env(),
            timeout_seconds: default_llm_timeout(),
            max_attempts: default_llm_attempts(),
        }
    }
}

/// Ingestion store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Structured extraction settings shared by every profile
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtractionConfig {
    /// Number of article pages fetched at once; 1 means sequential
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Drop duplicate URLs after sanitizing
    #[serde(default = "default_true")]
    pub dedupe: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            dedupe: true,
        }
    }
}

/// A site to extract articles from
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ProfileConfig {
    pub name: String,

    /// Page where link discovery starts
    pub seed_url: String,

    /// Only URLs starting with this prefix are treated as articles
    pub article_prefix: String,

    #[serde(default = "default_max_articles")]
    pub max_articles: usize,

    /// Wall-clock budget for scroll discovery
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u64,

    /// Pause between scroll actions (milliseconds)
    #[serde(default = "default_scroll_interval_ms")]
    pub scroll_interval_ms: u64,

    /// Elements removed from fetched HTML before links and fields are read
    #[serde(default)]
    pub excluded_tags: Vec<String>,

    /// Readiness condition for article pages, e.g. `css:body`
    #[serde(default)]
    pub wait_for: Option<String>,

    /// Replaces scroll discovery with a best-first crawl when present
    #[serde(default)]
    pub deep: Option<DeepConfig>,

    /// Static CSS extraction schema
    #[serde(default)]
    pub schema: Option<CssSchema>,

    /// Schema inferred once per run from a sample page
    #[serde(default)]
    pub infer_schema: Option<InferSchemaConfig>,

    /// Free-form extraction instruction sent to the LLM with each page
    #[serde(default)]
    pub llm_instruction: Option<String>,

    #[serde(default)]
    pub fields: FieldMapping,
}

/// Best-first crawl settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeepConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Domain patterns (`example.com`, `*.example.com`); empty allows any domain
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// URL globs; a leading `/` matches the path only
    #[serde(default)]
    pub url_patterns: Vec<String>,

    /// Keywords for relevance ordering; empty keeps discovery order
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub include_external: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct InferSchemaConfig {
    /// File holding a representative article's HTML
    pub sample_html_path: String,

    /// Description of the wanted fields
    pub query: String,
}

fn default_true() -> bool {
    true
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_page_timeout_ms() -> u64 {
    30_000
}

fn default_wait_timeout_ms() -> u64 {
    10_000
}

fn default_llm_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_llm_attempts() -> u32 {
    3
}

fn default_concurrency() -> usize {
    1
}

fn default_max_articles() -> usize {
    100
}

fn default_duration_seconds() -> u64 {
    2
}

fn default_scroll_interval_ms() -> u64 {
    1_000
}

fn default_max_depth() -> u32 {
    2
}

fn default_max_pages() -> usize {
    50
}
