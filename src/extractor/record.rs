//! Typed article records

use crate::sanitizer::DatetimeNormalizer;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which extracted fields feed the typed article columns
///
/// Each list is tried in order and the first non-empty field wins.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldMapping {
    #[serde(default = "default_title_fields")]
    pub title: Vec<String>,
    #[serde(default = "default_date_fields")]
    pub date: Vec<String>,
    #[serde(default = "default_body_fields")]
    pub body: Vec<String>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            title: default_title_fields(),
            date: default_date_fields(),
            body: default_body_fields(),
        }
    }
}

fn default_title_fields() -> Vec<String> {
    vec!["title".to_string()]
}

fn default_date_fields() -> Vec<String> {
    vec!["date".to_string()]
}

fn default_body_fields() -> Vec<String> {
    vec!["full-article".to_string(), "body".to_string()]
}

/// One extracted article, keyed by URL
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRecord {
    pub url: String,
    pub title: Option<String>,
    pub published_at: Option<DateTime<FixedOffset>>,
    /// Date text as found on the page
    pub raw_date: Option<String>,
    pub body: Option<String>,
    /// Fields not consumed by the mapping
    pub extra: Map<String, Value>,
}

impl ArticleRecord {
    /// Converts an extracted record into an article
    ///
    /// A date the normalizer cannot read is logged and leaves `published_at`
    /// empty; the rest of the record is kept.
    ///
    /// # Arguments
    ///
    /// * `url` - Page the record came from
    /// * `record` - Field values as extracted
    /// * `mapping` - Field names holding the title, date and body
    /// * `normalizer` - Date normalizer, if dates should be parsed
    pub async fn from_record(
        url: &str,
        mut record: Map<String, Value>,
        mapping: &FieldMapping,
        normalizer: Option<&DatetimeNormalizer>,
    ) -> Self {
        record.remove("url");
        let title = take_first(&mut record, &mapping.title);
        let raw_date = take_first(&mut record, &mapping.date);
        let body = take_first(&mut record, &mapping.body);

        let published_at = match (&raw_date, normalizer) {
            (Some(raw), Some(normalizer)) => match normalizer.normalize(raw).await {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Leaving publication date empty");
                    None
                }
            },
            _ => None,
        };

        Self {
            url: url.to_string(),
            title,
            published_at,
            raw_date,
            body,
            extra: record,
        }
    }

    /// Calendar date of publication in the article's own offset
    pub fn published_date(&self) -> Option<chrono::NaiveDate> {
        self.published_at.map(|at| at.date_naive())
    }
}

/// Removes every listed field and returns the first non-empty one
fn take_first(record: &mut Map<String, Value>, names: &[String]) -> Option<String> {
    let mut found = None;
    for name in names {
        let Some(value) = record.remove(name) else {
            continue;
        };
        if found.is_none() {
            found = value_text(value);
        }
    }
    found
}

fn value_text(value: Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s,
        other => other.to_string(),
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
