//! Datetime normalizer chain
//!
//! Scraped bylines come in several shapes. Each [`DateStrategy`] handles one
//! format family; the normalizer tries them in order and returns the first
//! success.

use crate::llm::TextGenerator;
use crate::{FinsightError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// `Sat, April 19, 2025 at 9:30 AM`
const LONG_MONTH_FORMAT: &str = "%a, %B %d, %Y at %I:%M %p";

/// `Sun, Apr 20, 2025, 11:24 AM`
const SHORT_MONTH_FORMAT: &str = "%a, %b %d, %Y, %I:%M %p";

const FALLBACK_SYSTEM_PROMPT: &str = "You convert human-written date expressions into a \
machine-readable timestamp. Reply with exactly one line in the format \
'YYYY-MM-DD HH:MM:SS', or 'YYYY-MM-DD' when the time of day is unknown. \
Reply with nothing else.";

static ZONE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*(?:GMT|UTC)(?:\s*([+-])(\d{1,2})(?::?(\d{2}))?)?\s*$")
        .expect("zone suffix regex is valid")
});

/// One date format family
#[derive(Clone)]
pub enum DateStrategy {
    /// Full month name with "at" before the time, e.g. `Sat, April 19, 2025 at 9:30 AM GMT-4`
    LongMonth,
    /// Abbreviated month with a comma before the time, e.g. `Sun, Apr 20, 2025, 11:24 AM`
    ShortMonth,
    /// RFC 3339, as found in `<time datetime="...">` attributes
    Iso8601,
    /// Delegates to a text generator constrained to `YYYY-MM-DD[ HH:MM:SS]`
    NaturalLanguage(Arc<dyn TextGenerator>),
}

impl fmt::Debug for DateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongMonth => f.write_str("LongMonth"),
            Self::ShortMonth => f.write_str("ShortMonth"),
            Self::Iso8601 => f.write_str("Iso8601"),
            Self::NaturalLanguage(_) => f.write_str("NaturalLanguage"),
        }
    }
}

impl DateStrategy {
    /// Attempts to parse `raw`; `None` means this strategy does not apply
    pub async fn parse(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::LongMonth => parse_with_zone(raw, LONG_MONTH_FORMAT),
            Self::ShortMonth => parse_with_zone(raw, SHORT_MONTH_FORMAT),
            Self::Iso8601 => DateTime::parse_from_rfc3339(raw.trim()).ok(),
            Self::NaturalLanguage(generator) => {
                match generator
                    .generate_response(FALLBACK_SYSTEM_PROMPT, raw.trim())
                    .await
                {
                    Ok(reply) => parse_fallback_reply(&reply),
                    Err(e) => {
                        tracing::warn!(value = raw, error = %e, "Date fallback call failed");
                        None
                    }
                }
            }
        }
    }
}

/// Ordered chain of [`DateStrategy`] values
#[derive(Debug, Clone)]
pub struct DatetimeNormalizer {
    strategies: Vec<DateStrategy>,
}

impl DatetimeNormalizer {
    /// Builds a normalizer; an empty strategy list is a configuration error
    pub fn new(strategies: Vec<DateStrategy>) -> Result<Self> {
        if strategies.is_empty() {
            return Err(FinsightError::InvalidConfiguration(
                "datetime normalizer needs at least one strategy".to_string(),
            ));
        }
        Ok(Self { strategies })
    }

    /// The fixed-format strategies, without a fallback
    pub fn standard() -> Self {
        Self {
            strategies: vec![
                DateStrategy::LongMonth,
                DateStrategy::ShortMonth,
                DateStrategy::Iso8601,
            ],
        }
    }

    /// The fixed-format strategies followed by a natural-language fallback
    pub fn with_fallback(generator: Arc<dyn TextGenerator>) -> Self {
        let mut normalizer = Self::standard();
        normalizer
            .strategies
            .push(DateStrategy::NaturalLanguage(generator));
        normalizer
    }

    pub fn strategies(&self) -> &[DateStrategy] {
        &self.strategies
    }

    /// Normalizes a raw date string
    ///
    /// Strategies are tried in order and the first that accepts wins.
    ///
    /// # Arguments
    ///
    /// * `raw` - Date text as it appeared on the page
    ///
    /// # Returns
    ///
    /// * `Ok(DateTime<FixedOffset>)` - The parsed instant with its offset
    ///
    /// # Errors
    ///
    /// [`FinsightError::UnparseableDate`] when no strategy accepts the input.
    pub async fn normalize(&self, raw: &str) -> Result<DateTime<FixedOffset>> {
        for strategy in &self.strategies {
            if let Some(parsed) = strategy.parse(raw).await {
                tracing::trace!(value = raw, ?strategy, "Date parsed");
                return Ok(parsed);
            }
        }
        Err(FinsightError::UnparseableDate {
            value: raw.to_string(),
        })
    }
}

/// Splits a trailing `GMT±H[H][[:]MM]` / `UTC` suffix off `raw`
///
/// Returns the remaining text and the parsed offset. Without a suffix the
/// offset is UTC. Returns `None` for an out-of-range offset.
fn split_zone(raw: &str) -> Option<(&str, FixedOffset)> {
    let raw = raw.trim();
    let Some(caps) = ZONE_SUFFIX.captures(raw) else {
        return Some((raw, FixedOffset::east_opt(0)?));
    };

    let body = &raw[..caps.get(0)?.start()];
    let seconds = match (caps.get(1), caps.get(2)) {
        (Some(sign), Some(hours)) => {
            let hours: i32 = hours.as_str().parse().ok()?;
            let minutes: i32 = caps
                .get(3)
                .map(|m| m.as_str().parse())
                .transpose()
                .ok()?
                .unwrap_or(0);
            if hours > 14 || minutes > 59 {
                return None;
            }
            let total = hours * 3600 + minutes * 60;
            if sign.as_str() == "-" {
                -total
            } else {
                total
            }
        }
        _ => 0,
    };

    Some((body, FixedOffset::east_opt(seconds)?))
}

fn parse_with_zone(raw: &str, format: &str) -> Option<DateTime<FixedOffset>> {
    let (body, offset) = split_zone(raw)?;
    let naive = NaiveDateTime::parse_from_str(body.trim(), format).ok()?;
    offset.from_local_datetime(&naive).single()
}

fn parse_fallback_reply(reply: &str) -> Option<DateTime<FixedOffset>> {
    let reply = reply.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`');
    let utc = FixedOffset::east_opt(0)?;

    if let Ok(naive) = NaiveDateTime::parse_from_str(reply, "%Y-%m-%d %H:%M:%S") {
        return utc.from_local_datetime(&naive).single();
    }
    let date = NaiveDate::parse_from_str(reply, "%Y-%m-%d").ok()?;
    utc.from_local_datetime(&date.and_hms_opt(0, 0, 0)?).single()
}
