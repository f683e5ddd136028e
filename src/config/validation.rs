use crate::config::types::{ClassifierConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::config::MIN_RATE_LIMIT_SECONDS;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_classifier_config(&config.classifier)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let start = Url::parse(&config.start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start-url: {}", e)))?;

    if start.scheme() != "http" && start.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "start-url must use http or https, got '{}'",
            start.scheme()
        )));
    }

    if start.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "start-url '{}' has no host",
            config.start_url
        )));
    }

    if !config.rate_limit_seconds.is_finite() || config.rate_limit_seconds < MIN_RATE_LIMIT_SECONDS
    {
        return Err(ConfigError::Validation(format!(
            "rate_limit_seconds must be >= {}, got {}",
            MIN_RATE_LIMIT_SECONDS, config.rate_limit_seconds
        )));
    }

    if config.request_timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_seconds must be >= 1, got {}",
            config.request_timeout_seconds
        )));
    }

    if config.pause_poll_millis < 10 {
        return Err(ConfigError::Validation(format!(
            "pause_poll_millis must be >= 10ms, got {}ms",
            config.pause_poll_millis
        )));
    }

    Ok(())
}

/// Validates the link classification rules
fn validate_classifier_config(config: &ClassifierConfig) -> Result<(), ConfigError> {
    Selector::parse(&config.results_selector).map_err(|e| {
        ConfigError::InvalidSelector(format!("'{}': {:?}", config.results_selector, e))
    })?;

    validate_extension("pdf_extension", &config.pdf_extension)?;

    if config.page_extensions.is_empty() {
        return Err(ConfigError::Validation(
            "page_extensions cannot be empty".to_string(),
        ));
    }
    for ext in &config.page_extensions {
        validate_extension("page_extensions", ext)?;
    }

    validate_keywords("pdf_keywords", &config.pdf_keywords)?;
    validate_keywords("page_keywords", &config.page_keywords)?;

    Ok(())
}

fn validate_extension(field: &str, ext: &str) -> Result<(), ConfigError> {
    if ext.len() < 2 || !ext.starts_with('.') {
        return Err(ConfigError::Validation(format!(
            "{} entries must look like '.ext', got '{}'",
            field, ext
        )));
    }
    Ok(())
}

fn validate_keywords(field: &str, keywords: &[String]) -> Result<(), ConfigError> {
    if keywords.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
    }

    if keywords.iter().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "{} cannot contain blank entries",
            field
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.pdf_root.trim().is_empty() {
        return Err(ConfigError::Validation(
            "pdf_root cannot be empty".to_string(),
        ));
    }

    if matches!(&config.results_path, Some(p) if p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "results_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
