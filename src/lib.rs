//! Finsight-Crawl: financial news exploration and ingestion
//!
//! This crate drives a browser-backed crawler across a news site, discovers
//! article URLs through pluggable exploration strategies, cleans them through a
//! sanitizer chain, extracts structured article records from each page and
//! stores them in a local article database.

pub mod browser;
pub mod config;
pub mod explore;
pub mod extractor;
pub mod llm;
pub mod pipeline;
pub mod robots;
pub mod sanitizer;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Finsight-Crawl operations
#[derive(Debug, Error)]
pub enum FinsightError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to load {url}: {message}")]
    PageLoad { url: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unparseable date: '{value}'")]
    UnparseableDate { value: String },

    #[error("Extraction error: {0}")]
    Extraction(#[from] extractor::ExtractionError),

    #[error("LLM error: {0}")]
    Llm(#[from] llm::LlmError),

    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),

    #[error("Invalid URL pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Result type alias for Finsight-Crawl operations
pub type Result<T> = std::result::Result<T, FinsightError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use browser::{BrowserDriver, PageResult, RunConfig, Session};
pub use config::Config;
pub use explore::ExplorationStrategy;
pub use extractor::{ArticleRecord, StructuredExtractor, UrlExtractor};
pub use sanitizer::{DatetimeNormalizer, SanitizerChain, UrlSanitizer};
pub use storage::{ArticleStore, SqliteArticleStore};
pub use url::{extract_domain, normalize_url};
