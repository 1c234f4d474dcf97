//! CSS extraction schemas

use crate::browser::collapse_whitespace;
use crate::extractor::ExtractionError;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a field's value is read from the matched element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Text content, whitespace-collapsed
    #[default]
    Text,
    /// Inner HTML
    Html,
    /// Value of [`CssField::attribute`]
    Attribute,
}

/// One named field of a [`CssSchema`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CssField {
    pub name: String,
    /// Selector relative to the base element
    pub selector: String,
    #[serde(default, alias = "type")]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl CssField {
    pub fn text(name: &str, selector: &str) -> Self {
        Self {
            name: name.to_string(),
            selector: selector.to_string(),
            kind: FieldKind::Text,
            attribute: None,
        }
    }

    pub fn html(name: &str, selector: &str) -> Self {
        Self {
            kind: FieldKind::Html,
            ..Self::text(name, selector)
        }
    }

    pub fn attribute(name: &str, selector: &str, attribute: &str) -> Self {
        Self {
            kind: FieldKind::Attribute,
            attribute: Some(attribute.to_string()),
            ..Self::text(name, selector)
        }
    }
}

/// Selector map from page HTML to records
///
/// Every element matched by `base_selector` becomes one record. Each field
/// takes the first match of its selector inside that element; a field that
/// matches nothing is left out of the record.
///
/// ```
/// use finsight_crawl::extractor::{CssField, CssSchema};
///
/// let schema = CssSchema {
///     name: "Story".to_string(),
///     base_selector: "article".to_string(),
///     fields: vec![CssField::text("title", "h1")],
/// };
/// let records = schema.apply("<article><h1> Rates  hold </h1></article>").unwrap();
/// assert_eq!(records[0]["title"], "Rates hold");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CssSchema {
    #[serde(default)]
    pub name: String,
    #[serde(alias = "baseSelector")]
    pub base_selector: String,
    pub fields: Vec<CssField>,
}

impl CssSchema {
    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.base_selector.trim().is_empty() {
            return Err(ExtractionError::Schema(format!(
                "schema '{}' has an empty base selector",
                self.name
            )));
        }
        parse_selector(&self.base_selector)?;

        if self.fields.is_empty() {
            return Err(ExtractionError::Schema(format!(
                "schema '{}' has no fields",
                self.name
            )));
        }

        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(ExtractionError::Schema(format!(
                    "schema '{}' has a field without a name",
                    self.name
                )));
            }
            parse_selector(&field.selector)?;
            if field.kind == FieldKind::Attribute
                && field.attribute.as_deref().map_or(true, |a| a.trim().is_empty())
            {
                return Err(ExtractionError::Schema(format!(
                    "field '{}' reads an attribute but names none",
                    field.name
                )));
            }
        }

        Ok(())
    }

    /// Extracts one record per base element of `html`
    ///
    /// # Arguments
    ///
    /// * `html` - A loaded page
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Map<String, Value>>)` - One record per base match; a field whose
    ///   selector matches nothing is omitted from its record
    /// * `Err(ExtractionError)` - If a selector does not parse
    pub fn apply(&self, html: &str) -> Result<Vec<Map<String, Value>>, ExtractionError> {
        let base = parse_selector(&self.base_selector)?;
        let fields = self
            .fields
            .iter()
            .map(|field| Ok((field, parse_selector(&field.selector)?)))
            .collect::<Result<Vec<_>, ExtractionError>>()?;

        let document = Html::parse_document(html);
        let records = document
            .select(&base)
            .map(|element| {
                fields
                    .iter()
                    .filter_map(|(field, selector)| {
                        let matched = element.select(selector).next()?;
                        let value = read_field(field, matched)?;
                        Some((field.name.clone(), Value::String(value)))
                    })
                    .collect::<Map<String, Value>>()
            })
            .collect();

        Ok(records)
    }
}

fn read_field(field: &CssField, element: ElementRef<'_>) -> Option<String> {
    match field.kind {
        FieldKind::Text => Some(collapse_whitespace(
            &element.text().collect::<Vec<_>>().join(" "),
        )),
        FieldKind::Html => Some(element.inner_html().trim().to_string()),
        FieldKind::Attribute => field
            .attribute
            .as_deref()
            .and_then(|name| element.value().attr(name))
            .map(|value| value.trim().to_string()),
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(selector)
        .map_err(|e| ExtractionError::Schema(format!("invalid selector '{}': {:?}", selector, e)))
}
