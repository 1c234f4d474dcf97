use crate::config::types::{
    BrowserSettings, Config, DeepConfig, DriverKind, ExtractionConfig, LlmConfig, ProfileConfig,
    UserAgentConfig,
};
use crate::url::compile_patterns;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
///
/// # Arguments
///
/// * `config` - The parsed configuration
///
/// # Returns
///
/// * `Ok(())` - If every section is valid
/// * `Err(ConfigError)` - The first problem found
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_browser(&config.browser)?;
    validate_user_agent_config(&config.user_agent)?;
    if let Some(llm) = &config.llm {
        validate_llm(llm)?;
    }
    if config.storage.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    validate_extraction(&config.extraction)?;

    let mut names = HashSet::new();
    for profile in &config.profiles {
        if !names.insert(profile.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "profile '{}' is defined more than once",
                profile.name
            )));
        }
        validate_profile(profile, config.llm.is_some())?;
    }

    Ok(())
}

fn validate_browser(browser: &BrowserSettings) -> Result<(), ConfigError> {
    if browser.driver == DriverKind::Webdriver {
        parse_http_url("webdriver-url", &browser.webdriver_url)?;
    }

    if browser.page_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "page-timeout-ms must be >= 100ms, got {}ms",
            browser.page_timeout_ms
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    parse_http_url("llm endpoint", &llm.endpoint)?;

    if llm.model.trim().is_empty() || llm.api_key_env.trim().is_empty() {
        return Err(ConfigError::Validation(
            "llm model and api-key-env cannot be empty".to_string(),
        ));
    }

    if llm.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "llm max-attempts must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_extraction(extraction: &ExtractionConfig) -> Result<(), ConfigError> {
    if !(1..=64).contains(&extraction.concurrency) {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 64, got {}",
            extraction.concurrency
        )));
    }
    Ok(())
}

/// Validates one `[[profile]]` entry
pub(crate) fn validate_profile(profile: &ProfileConfig, has_llm: bool) -> Result<(), ConfigError> {
    let name = &profile.name;
    if name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "profile name cannot be empty".to_string(),
        ));
    }

    parse_http_url(&format!("seed-url of profile '{}'", name), &profile.seed_url)?;

    if profile.article_prefix.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "profile '{}': article-prefix cannot be empty",
            name
        )));
    }

    for (field, value) in [
        ("max-articles", profile.max_articles as u64),
        ("duration-seconds", profile.duration_seconds),
        ("scroll-interval-ms", profile.scroll_interval_ms),
    ] {
        if value < 1 {
            return Err(ConfigError::Validation(format!(
                "profile '{}': {} must be >= 1",
                name, field
            )));
        }
    }

    if let Some(wait_for) = &profile.wait_for {
        if wait_for.strip_prefix("css:").map_or(true, |s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "profile '{}': wait-for must look like 'css:<selector>', got '{}'",
                name, wait_for
            )));
        }
    }

    if let Some(deep) = &profile.deep {
        validate_deep(name, deep)?;
    }

    let strategies = [
        profile.schema.is_some(),
        profile.infer_schema.is_some(),
        profile.llm_instruction.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();
    if strategies != 1 {
        return Err(ConfigError::Validation(format!(
            "profile '{}' must set exactly one of schema, infer-schema or llm-instruction",
            name
        )));
    }

    if let Some(schema) = &profile.schema {
        schema
            .validate()
            .map_err(|e| ConfigError::Validation(format!("profile '{}': {}", name, e)))?;
    }

    if (profile.infer_schema.is_some() || profile.llm_instruction.is_some()) && !has_llm {
        return Err(ConfigError::Validation(format!(
            "profile '{}' needs an [llm] section",
            name
        )));
    }

    Ok(())
}

fn validate_deep(name: &str, deep: &DeepConfig) -> Result<(), ConfigError> {
    if deep.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "profile '{}': max-pages must be >= 1",
            name
        )));
    }

    for pattern in &deep.allowed_domains {
        validate_domain_pattern(pattern)?;
    }

    compile_patterns(&deep.url_patterns)
        .map_err(|e| ConfigError::InvalidPattern(format!("profile '{}': {}", name, e)))?;

    Ok(())
}

fn parse_http_url(what: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("{} '{}': {}", what, value, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            what, value
        )));
    }
    Ok(url)
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);

    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain pattern '{}' has no domain",
            pattern
        )));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with(['.', '-']) || domain.ends_with(['.', '-']) || domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' has a misplaced '.' or '-'",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.contains('@')
        }
        None => false,
    };

    if !valid {
        return Err(ConfigError::Validation(format!(
            "Invalid contact-email: '{}'",
            email
        )));
    }

    Ok(())
}
