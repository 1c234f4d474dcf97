//! Built-in site profiles

use crate::config::types::{Config, ProfileConfig};
use crate::extractor::{CssField, CssSchema, FieldMapping};

pub const YAHOO_FINANCE: &str = "yahoo_finance";

/// The Yahoo Finance news profile
///
/// Discovery scrolls the news feed; extraction reads the article wrapper with
/// fixed selectors for the headline, the byline time and the story body.
pub fn yahoo_finance() -> ProfileConfig {
    ProfileConfig {
        name: YAHOO_FINANCE.to_string(),
        seed_url: "https://finance.yahoo.com/news".to_string(),
        article_prefix: "https://finance.yahoo.com/news/".to_string(),
        max_articles: 100,
        duration_seconds: 2,
        scroll_interval_ms: 1_000,
        excluded_tags: vec![
            "form".to_string(),
            "header".to_string(),
            "footer".to_string(),
            "button".to_string(),
        ],
        wait_for: Some("css:body".to_string()),
        deep: None,
        schema: Some(CssSchema {
            name: "Yahoo Finance Article".to_string(),
            base_selector: "div.article-wrap".to_string(),
            fields: vec![
                CssField::text("title", "div.cover-title"),
                CssField::text("date", "time.byline-attr-meta-time"),
                CssField::attribute("published", "time.byline-attr-meta-time", "datetime"),
                CssField::text("author", "div.byline-attr-author"),
                CssField::text("full-article", "div.body"),
            ],
        }),
        infer_schema: None,
        llm_instruction: None,
        fields: FieldMapping::default(),
    }
}

/// Profiles available without any `[[profile]]` entries
pub fn builtin_profiles() -> Vec<ProfileConfig> {
    vec![yahoo_finance()]
}

impl Config {
    /// Every available profile; configured profiles replace built-ins of the same name
    pub fn all_profiles(&self) -> Vec<ProfileConfig> {
        let mut profiles: Vec<ProfileConfig> = builtin_profiles()
            .into_iter()
            .filter(|builtin| !self.profiles.iter().any(|p| p.name == builtin.name))
            .collect();
        profiles.extend(self.profiles.iter().cloned());
        profiles
    }

    pub fn find_profile(&self, name: &str) -> Option<ProfileConfig> {
        self.all_profiles().into_iter().find(|p| p.name == name)
    }
}
