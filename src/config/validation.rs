use std::collections::HashSet;
use url::Url;

use crate::config::types::{Config, HttpConfig, SourceConfig};
use crate::dedup::DeduplicationOptions;
use crate::models::DelayRange;
use crate::parsers::SelectorParser;
use crate::scraper::paging::{page_url, PAGE_PLACEHOLDER};
use crate::scraper::SourceDefinition;
use crate::{ConfigError, IngestError};

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_http_config(&config.http)?;

    if config.storage.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    validate_dedup_options(&config.dedup)?;
    validate_sources(&config.sources)?;
    Ok(())
}

fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "HTTP timeouts must be at least one second".to_string(),
        ));
    }

    Ok(())
}

fn validate_dedup_options(options: &DeduplicationOptions) -> Result<(), ConfigError> {
    for (name, value) in [
        ("min-similarity-score", options.min_similarity_score),
        ("skip-threshold", options.skip_threshold),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 0 and 1, got {}",
                name, value
            )));
        }
    }

    if options.skip_threshold < options.min_similarity_score {
        return Err(ConfigError::Validation(format!(
            "skip-threshold ({}) must not be below min-similarity-score ({})",
            options.skip_threshold, options.min_similarity_score
        )));
    }

    if options.candidate_limit == 0 {
        return Err(ConfigError::Validation(
            "candidate-limit must be >= 1".to_string(),
        ));
    }

    let weights = options.weights;
    if [weights.apply_link, weights.title, weights.company, weights.location]
        .iter()
        .any(|w| !w.is_finite() || *w < 0.0)
    {
        return Err(ConfigError::Validation(
            "similarity weights must be non-negative".to_string(),
        ));
    }

    Ok(())
}

fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for source in sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "source name cannot be empty".to_string(),
            ));
        }
        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate source name '{}'",
                source.name
            )));
        }

        let definition = source.resolve()?;
        validate_definition(&definition)?;
    }

    Ok(())
}

/// Validates a resolved source
fn validate_definition(definition: &SourceDefinition) -> Result<(), ConfigError> {
    let name = &definition.name;

    if definition.rate_limit.requests_per_minute == 0 {
        return Err(ConfigError::Validation(format!(
            "requests-per-minute for '{}' must be >= 1",
            name
        )));
    }
    validate_delay(name, "delay-between-requests", &definition.rate_limit.delay_between_requests)?;
    validate_delay(name, "page-delay", &definition.page_delay)?;

    if definition.retry.max_attempts == 0 {
        return Err(ConfigError::Validation(format!(
            "max-attempts for '{}' must be >= 1",
            name
        )));
    }

    if !definition.page_url.contains(PAGE_PLACEHOLDER) {
        return Err(ConfigError::Validation(format!(
            "page-url for '{}' must contain {}",
            name, PAGE_PLACEHOLDER
        )));
    }
    Url::parse(&page_url(&definition.page_url, 1)).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid page-url for '{}': {}", name, e))
    })?;

    let mut ids = HashSet::new();
    for table in &definition.versions {
        if !ids.insert(table.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate version id '{}' for '{}'",
                table.id, name
            )));
        }
        SelectorParser::new(name, definition.base_url.clone(), table.clone()).map_err(
            |e| match e {
                IngestError::Config(inner) => inner,
                other => ConfigError::Validation(other.to_string()),
            },
        )?;
    }

    if let Some(active) = &definition.active_version {
        if !ids.contains(active.as_str()) {
            return Err(ConfigError::Validation(format!(
                "active-version '{}' is not defined for '{}'",
                active, name
            )));
        }
    }

    Ok(())
}

fn validate_delay(source: &str, field: &str, delay: &DelayRange) -> Result<(), ConfigError> {
    if delay.min_ms > delay.max_ms {
        return Err(ConfigError::Validation(format!(
            "{} for '{}' has min-ms {} above max-ms {}",
            field, source, delay.min_ms, delay.max_ms
        )));
    }
    Ok(())
}
