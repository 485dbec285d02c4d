use crate::config::types::{Config, CrawlerOptions, FilterConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_options(&config.crawler)?;
    validate_filter_config(&config.filter)?;
    Ok(())
}

/// Validates crawl options
fn validate_crawler_options(options: &CrawlerOptions) -> Result<(), ConfigError> {
    // depth is clamped at deserialization, any u32 is acceptable

    if options.max_concurrent_requests < 1 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be >= 1, got {}",
            options.max_concurrent_requests
        )));
    }

    if options.max_requests_per_second < 1 {
        return Err(ConfigError::Validation(format!(
            "max-requests-per-second must be >= 1, got {}",
            options.max_requests_per_second
        )));
    }

    if options.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation("user-agent cannot be empty".to_string()));
    }

    if options.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request-timeout must be at least 1 second".to_string(),
        ));
    }

    Ok(())
}

/// Validates the allow/deny domain lists
fn validate_filter_config(filter: &FilterConfig) -> Result<(), ConfigError> {
    for pattern in filter.allow.iter().chain(filter.deny.iter()) {
        validate_domain_pattern(pattern)?;
    }
    Ok(())
}

/// Validates a domain pattern (supports a leading `*.` wildcard)
pub fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern("Domain pattern cannot be empty".to_string()));
    }

    let domain = pattern.strip_prefix("*.").unwrap_or(pattern);
    validate_domain_string(domain)
}

/// Validates a host name (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern("Domain cannot be empty".to_string()));
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

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
