use crate::extractor::CssSchema;
use crate::llm::TextGenerator;
use crate::{FinsightError, Result};

const SCHEMA_SYSTEM_PROMPT: &str = r#"You write CSS extraction schemas for web pages.
Given a sample of HTML and a description of the wanted fields, reply with a single JSON object of the form:
{"name": "<schema name>", "baseSelector": "<css selector of the repeating element>", "fields": [{"name": "<field>", "selector": "<css selector relative to the base element>", "type": "text" | "html" | "attribute", "attribute": "<attribute name, only for type attribute>"}]}
Use only selectors that exist in the sample. Reply with the JSON object only."#;

/// Removes a surrounding Markdown code fence (```json ... ```) if present
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string on the opening fence line
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Asks the generator for a CSS schema describing `sample_html`
///
/// The reply must be a JSON object in the schema shape; it is validated before
/// being returned.
///
/// # Arguments
///
/// * `generator` - Model that writes the schema
/// * `sample_html` - A representative article page
/// * `query` - Plain-language description of the wanted fields
///
/// # Returns
///
/// * `Ok(CssSchema)` - A validated schema
/// * `Err(FinsightError)` - If the model fails or replies with an unusable schema
pub async fn infer_css_schema(
    generator: &dyn TextGenerator,
    sample_html: &str,
    query: &str,
) -> Result<CssSchema> {
    let user_prompt = format!(
        "Sample HTML:\n{}\n\nWanted fields:\n{}",
        sample_html.trim(),
        query.trim()
    );

    let reply = generator
        .generate_response(SCHEMA_SYSTEM_PROMPT, &user_prompt)
        .await?;

    let schema: CssSchema = serde_json::from_str(strip_code_fences(&reply)).map_err(|e| {
        FinsightError::InvalidConfiguration(format!("inferred schema is not valid JSON: {}", e))
    })?;
    schema.validate()?;

    tracing::info!(
        schema = %schema.name,
        base_selector = %schema.base_selector,
        fields = schema.fields.len(),
        "Inferred extraction schema"
    );
    Ok(schema)
}
