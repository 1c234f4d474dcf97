//! Ingestion store
//!
//! Persists extracted articles and the runs that produced them:
//! - SQLite database initialization and schema management
//! - Run tracking with requested/obtained counts
//! - Article upserts keyed by collection and URL

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteArticleStore;
pub use traits::{ArticleStore, StorageError, StorageResult};

use crate::FinsightError;
use serde_json::{Map, Value};
use std::path::Path;

/// Opens (creating if needed) the article database at `path`
pub fn open_storage(path: &Path) -> Result<SqliteArticleStore, FinsightError> {
    SqliteArticleStore::new(path)
}

/// An ingestion run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub profile: String,
    pub config_hash: String,
    pub status: RunStatus,
    pub requested: Option<u64>,
    pub obtained: Option<u64>,
}

/// An article as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArticle {
    pub collection: String,
    pub url: String,
    pub title: Option<String>,
    /// RFC 3339 timestamp
    pub published_at: Option<String>,
    pub raw_date: Option<String>,
    pub body: Option<String>,
    pub extra: Map<String, Value>,
    pub ingested_at: String,
    pub run_id: Option<i64>,
}

/// Status of an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    /// Finished with fewer articles than requested
    Partial,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "partial" => Some(Self::Partial),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
