//! URL discovery and structured extraction
//!
//! [`UrlExtractor`] loads a seed page, runs an exploration strategy over it
//! and sanitizes the result. [`StructuredExtractor`] then fetches each article
//! URL and turns the page into records.

mod record;
mod schema;
mod structured;
mod urls;

pub use record::{ArticleRecord, FieldMapping};
pub use schema::{CssField, CssSchema, FieldKind};
pub use structured::{Concurrency, CrawlOutcome, ExtractionStrategy, StructuredExtractor};
pub use urls::UrlExtractor;

use thiserror::Error;

/// Per-page extraction failures
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The payload for a page could not be read as records
    #[error("Failed to parse extracted content: {0}")]
    Parse(String),

    #[error("Invalid extraction schema: {0}")]
    Schema(String),

    #[error("Extraction call failed: {0}")]
    Llm(#[from] crate::llm::LlmError),
}
