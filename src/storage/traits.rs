//! Storage traits and error types

use crate::extractor::ArticleRecord;
use crate::storage::{RunRecord, RunStatus, StoredArticle};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Sink for extracted articles
///
/// Articles are keyed by `(collection, url)`; writing the same URL again
/// updates the stored row.
pub trait ArticleStore {
    // ===== Run Management =====

    /// Records the start of an ingestion run
    ///
    /// # Arguments
    ///
    /// * `profile` - Name of the profile being run
    /// * `config_hash` - Hash of the configuration file, for auditing
    ///
    /// # Returns
    ///
    /// * `Ok(i64)` - Id of the new run, in `Running` state
    /// * `Err(StorageError)` - If the run cannot be recorded
    fn create_run(&mut self, profile: &str, config_hash: &str) -> StorageResult<i64>;

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Marks a run finished with its final status and article counts
    ///
    /// # Arguments
    ///
    /// * `run_id` - Id returned by [`create_run`](Self::create_run)
    /// * `status` - Final status
    /// * `requested` - Article cap in effect for the run
    /// * `obtained` - Articles actually extracted
    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        requested: usize,
        obtained: usize,
    ) -> StorageResult<()>;

    // ===== Articles =====

    /// Inserts or updates articles
    ///
    /// # Arguments
    ///
    /// * `collection` - Collection the articles belong to
    /// * `run_id` - Run that produced them, if any
    /// * `articles` - Articles keyed by URL; an existing row is replaced
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of rows written
    /// * `Err(StorageError)` - If the write fails; nothing is written then
    fn upsert_articles(
        &mut self,
        collection: &str,
        run_id: Option<i64>,
        articles: &[ArticleRecord],
    ) -> StorageResult<usize>;

    fn count_articles(&self, collection: &str) -> StorageResult<u64>;

    /// Every collection with its article count, by name
    fn list_collections(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Most recently ingested articles first
    fn recent_articles(&self, collection: &str, limit: usize) -> StorageResult<Vec<StoredArticle>>;
}
