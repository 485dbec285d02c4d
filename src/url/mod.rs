//! URL handling module for crawl-bot
//!
//! This module provides host extraction, wildcard domain matching, and the
//! [`UrlFilter`] that turns the `[filter]` configuration into a
//! `should_crawl_url` predicate.

mod domain;
mod matcher;

use crate::config::FilterConfig;
use crate::crawler::UrlPredicate;
use crate::ConfigError;
use std::sync::Arc;

// Re-export main functions
pub use domain::{canonicalize_url, extract_host, is_http_url};
pub use matcher::DomainPattern;

/// Verdict of the URL filter for a single URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlVerdict {
    /// The URL may be fetched and its links followed
    Allowed,
    /// The host matches a deny pattern
    Denied,
    /// The host is not the seed host while `same-host` is on
    OffHost,
    /// The host matches no allow pattern
    NotAllowed,
    /// The URL has no host to classify
    NoHost,
}

impl UrlVerdict {
    /// Returns true if the URL should be crawled
    pub fn should_crawl(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Domain-based URL filter
///
/// Rules are checked in the following priority order:
/// 1. Deny list (highest priority)
/// 2. Same-host restriction
/// 3. Allow list (an empty list allows everything)
#[derive(Debug, Clone, Default)]
pub struct UrlFilter {
    allow: Vec<DomainPattern>,
    deny: Vec<DomainPattern>,
    seed_host: Option<String>,
}

impl UrlFilter {
    /// Compiles the filter configuration for a crawl starting at `seed_url`
    pub fn from_config(filter: &FilterConfig, seed_url: &str) -> Result<Self, ConfigError> {
        let allow = filter
            .allow
            .iter()
            .map(|p| DomainPattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;
        let deny = filter
            .deny
            .iter()
            .map(|p| DomainPattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;

        let seed_host = if filter.same_host {
            let host = extract_host(seed_url).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "same-host requires a seed URL with a host, got '{}'",
                    seed_url
                ))
            })?;
            Some(host)
        } else {
            None
        };

        Ok(Self {
            allow,
            deny,
            seed_host,
        })
    }

    /// Returns true when the filter has no rules at all
    pub fn is_permissive(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty() && self.seed_host.is_none()
    }

    /// Classifies a URL against the filter rules
    pub fn classify(&self, url: &str) -> UrlVerdict {
        if self.is_permissive() {
            return UrlVerdict::Allowed;
        }

        let host = match extract_host(url) {
            Some(host) => host,
            None => return UrlVerdict::NoHost,
        };

        // Priority 1: deny list
        if self.deny.iter().any(|p| p.matches(&host)) {
            return UrlVerdict::Denied;
        }

        // Priority 2: same-host restriction
        if let Some(seed_host) = &self.seed_host {
            if &host != seed_host {
                return UrlVerdict::OffHost;
            }
        }

        // Priority 3: allow list
        if !self.allow.is_empty() && !self.allow.iter().any(|p| p.matches(&host)) {
            return UrlVerdict::NotAllowed;
        }

        UrlVerdict::Allowed
    }

    /// Returns true if the URL should be crawled
    pub fn allows(&self, url: &str) -> bool {
        self.classify(url).should_crawl()
    }

    /// Wraps the filter as a `should_crawl_url` predicate
    pub fn into_predicate(self) -> UrlPredicate {
        Arc::new(move |url: &str| self.allows(url))
    }
}
