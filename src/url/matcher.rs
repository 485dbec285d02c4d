use crate::config::validate_domain_pattern;
use crate::ConfigError;
use std::fmt;

/// A compiled domain pattern from the `[filter]` configuration
///
/// Two forms are supported:
/// 1. Exact: `example.com` matches only `example.com`
/// 2. Wildcard: `*.example.com` matches `example.com` itself and any
///    subdomain, however deeply nested
///
/// Matching is case-insensitive.
///
/// # Examples
///
/// ```
/// use crawl_bot::url::DomainPattern;
///
/// let pattern = DomainPattern::parse("*.example.com").unwrap();
/// assert!(pattern.matches("example.com"));
/// assert!(pattern.matches("api.v2.example.com"));
/// assert!(!pattern.matches("example.org"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainPattern {
    Exact(String),
    Wildcard(String),
}

impl DomainPattern {
    /// Validates and compiles a pattern string
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        validate_domain_pattern(pattern)?;

        let lowered = pattern.to_ascii_lowercase();
        Ok(match lowered.strip_prefix("*.") {
            Some(base) => Self::Wildcard(base.to_string()),
            None => Self::Exact(lowered),
        })
    }

    /// Returns true if `host` is covered by this pattern
    pub fn matches(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        match self {
            Self::Exact(domain) => host == *domain,
            Self::Wildcard(base) => host == *base || host.ends_with(&format!(".{}", base)),
        }
    }
}

impl fmt::Display for DomainPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(domain) => write!(f, "{}", domain),
            Self::Wildcard(base) => write!(f, "*.{}", base),
        }
    }
}
