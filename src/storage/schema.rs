//! Database schema definitions

/// SQL schema for the ingestion database
pub const SCHEMA_SQL: &str = r#"
-- One row per ingestion run
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    profile TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    requested INTEGER,
    obtained INTEGER
);

-- Extracted articles; URL is the key within a collection
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT,
    published_at TEXT,
    raw_date TEXT,
    body TEXT,
    extra_json TEXT NOT NULL DEFAULT '{}',
    ingested_at TEXT NOT NULL,
    run_id INTEGER REFERENCES runs(id),
    UNIQUE(collection, url)
);

CREATE INDEX IF NOT EXISTS idx_articles_collection ON articles(collection);
CREATE INDEX IF NOT EXISTS idx_articles_ingested ON articles(collection, ingested_at);
"#;

pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
