//! SQLite article store

use crate::extractor::ArticleRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ArticleStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, StoredArticle};
use crate::FinsightError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::{Map, Value};
use std::path::Path;

/// SQLite-backed [`ArticleStore`]
pub struct SqliteArticleStore {
    conn: Connection,
}

impl SqliteArticleStore {
    /// Opens or creates the database at `path` and ensures the schema exists
    ///
    /// Missing parent directories are created.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteArticleStore)` - Store with the schema in place
    /// * `Err(FinsightError)` - If the directory, file or schema cannot be created
    pub fn new(path: &Path) -> Result<Self, FinsightError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// In-memory database, used by tests and dry runs
    pub fn new_in_memory() -> Result<Self, FinsightError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<(RunRecord, String)> {
    let status: String = row.get(5)?;
    let requested: Option<i64> = row.get(6)?;
    let obtained: Option<i64> = row.get(7)?;
    Ok((
        RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            profile: row.get(3)?,
            config_hash: row.get(4)?,
            status: RunStatus::Running,
            requested: requested.map(|n| n as u64),
            obtained: obtained.map(|n| n as u64),
        },
        status,
    ))
}

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<(StoredArticle, String)> {
    Ok((
        StoredArticle {
            collection: row.get(0)?,
            url: row.get(1)?,
            title: row.get(2)?,
            published_at: row.get(3)?,
            raw_date: row.get(4)?,
            body: row.get(5)?,
            extra: Map::new(),
            ingested_at: row.get(7)?,
            run_id: row.get(8)?,
        },
        row.get(6)?,
    ))
}

impl ArticleStore for SqliteArticleStore {
    fn create_run(&mut self, profile: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, profile, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![now, profile, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let found = self
            .conn
            .query_row(
                "SELECT id, started_at, finished_at, profile, config_hash, status, requested, obtained
                 FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?;

        let (mut run, status) = found.ok_or(StorageError::RunNotFound(run_id))?;
        run.status = RunStatus::from_db_string(&status).ok_or_else(|| {
            StorageError::Serialization(format!("unknown run status '{}'", status))
        })?;
        Ok(run)
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        requested: usize,
        obtained: usize,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET finished_at = ?1, status = ?2, requested = ?3, obtained = ?4
             WHERE id = ?5",
            params![
                now,
                status.to_db_string(),
                requested as i64,
                obtained as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Writes every article in one transaction
    ///
    /// # Arguments
    ///
    /// * `collection` - Collection the articles belong to
    /// * `run_id` - Run that produced them, if any
    /// * `articles` - Articles to write; `(collection, url)` is the key
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Rows inserted or updated
    /// * `Err(StorageError)` - If any row fails; the transaction is rolled back
    fn upsert_articles(
        &mut self,
        collection: &str,
        run_id: Option<i64>,
        articles: &[ArticleRecord],
    ) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO articles
                    (collection, url, title, published_at, raw_date, body, extra_json, ingested_at, run_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(collection, url) DO UPDATE SET
                    title = excluded.title,
                    published_at = excluded.published_at,
                    raw_date = excluded.raw_date,
                    body = excluded.body,
                    extra_json = excluded.extra_json,
                    ingested_at = excluded.ingested_at,
                    run_id = excluded.run_id",
            )?;
            for article in articles {
                let extra = serde_json::to_string(&article.extra)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                written += stmt.execute(params![
                    collection,
                    article.url,
                    article.title,
                    article.published_at.map(|d| d.to_rfc3339()),
                    article.raw_date,
                    article.body,
                    extra,
                    now,
                    run_id,
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!(collection = %collection, written, "Upserted articles");
        Ok(written)
    }

    fn count_articles(&self, collection: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE collection = ?1",
            params![collection],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn list_collections(&self) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT collection, COUNT(*) FROM articles GROUP BY collection ORDER BY collection",
        )?;
        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok((row.get::<_, String>(0)?, count as u64))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn recent_articles(&self, collection: &str, limit: usize) -> StorageResult<Vec<StoredArticle>> {
        let mut stmt = self.conn.prepare(
            "SELECT collection, url, title, published_at, raw_date, body, extra_json, ingested_at, run_id
             FROM articles WHERE collection = ?1
             ORDER BY ingested_at DESC, id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![collection, limit as i64], article_from_row)?;

        let mut articles = Vec::new();
        for row in rows {
            let (mut article, extra) = row?;
            article.extra = serde_json::from_str::<Map<String, Value>>(&extra)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            articles.push(article);
        }
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use serde_json::json;

    fn article(url: &str, title: &str) -> ArticleRecord {
        let mut extra = Map::new();
        extra.insert("author".to_string(), json!("Desk"));
        ArticleRecord {
            url: url.to_string(),
            title: Some(title.to_string()),
            published_at: DateTime::parse_from_rfc3339("2026-10-15T09:30:00-04:00").ok(),
            raw_date: Some("October 15, 2026 at 9:30 AM EDT".to_string()),
            body: Some("Stocks rose.".to_string()),
            extra,
        }
    }

    #[test]
    fn test_create_and_complete_run() {
        let mut store = SqliteArticleStore::new_in_memory().unwrap();
        let run_id = store.create_run("yahoo-finance", "abc123").unwrap();

        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.profile, "yahoo-finance");
        assert!(run.finished_at.is_none());

        store
            .complete_run(run_id, RunStatus::Partial, 10, 7)
            .unwrap();
        let run = store.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Partial);
        assert_eq!(run.requested, Some(10));
        assert_eq!(run.obtained, Some(7));
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_missing_run() {
        let mut store = SqliteArticleStore::new_in_memory().unwrap();
        assert!(matches!(store.get_run(42), Err(StorageError::RunNotFound(42))));
        assert!(matches!(
            store.complete_run(42, RunStatus::Failed, 0, 0),
            Err(StorageError::RunNotFound(42))
        ));
    }

    #[test]
    fn test_upsert_replaces_by_url() {
        let mut store = SqliteArticleStore::new_in_memory().unwrap();
        let run_id = store.create_run("p", "h").unwrap();

        let written = store
            .upsert_articles(
                "finance",
                Some(run_id),
                &[article("https://a.com/1", "First"), article("https://a.com/2", "Second")],
            )
            .unwrap();
        assert_eq!(written, 2);

        store
            .upsert_articles("finance", None, &[article("https://a.com/1", "Revised")])
            .unwrap();
        assert_eq!(store.count_articles("finance").unwrap(), 2);

        let recent = store.recent_articles("finance", 10).unwrap();
        let revised = recent.iter().find(|a| a.url == "https://a.com/1").unwrap();
        assert_eq!(revised.title.as_deref(), Some("Revised"));
        assert_eq!(revised.run_id, None);
        assert_eq!(revised.extra.get("author"), Some(&json!("Desk")));
        assert_eq!(
            revised.published_at.as_deref(),
            Some("2026-10-15T09:30:00-04:00")
        );
    }

    #[test]
    fn test_collections_are_separate() {
        let mut store = SqliteArticleStore::new_in_memory().unwrap();
        store
            .upsert_articles("finance", None, &[article("https://a.com/1", "A")])
            .unwrap();
        store
            .upsert_articles("markets", None, &[article("https://a.com/1", "A")])
            .unwrap();

        assert_eq!(
            store.list_collections().unwrap(),
            vec![("finance".to_string(), 1), ("markets".to_string(), 1)]
        );
        assert_eq!(store.count_articles("missing").unwrap(), 0);
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("articles.db");
        {
            let mut store = SqliteArticleStore::new(&path).unwrap();
            store
                .upsert_articles("finance", None, &[article("https://a.com/1", "A")])
                .unwrap();
        }
        let store = SqliteArticleStore::new(&path).unwrap();
        assert_eq!(store.count_articles("finance").unwrap(), 1);
    }
}
