//! crawl-bot: a rate-limited recursive web crawler
//!
//! This crate fetches a seed page, extracts its links and follows them up to a
//! configured depth. Request concurrency and request rate are bounded, visited
//! URLs are deduplicated across redirect chains, and every terminal fetch
//! outcome is reported through caller-supplied callbacks.

pub mod config;
pub mod crawler;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawl-bot operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Crawl task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// Errors reported by an HTTP transport for a single fetch
///
/// These never abort a crawl. They are handed to the failure callback inside
/// the [`crawler::CrawlPage`] of the URL that could not be fetched.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Too many redirects from {url}")]
    RedirectLimit { url: String },

    #[error("Redirect loop detected at {url}")]
    RedirectLoop { url: String },

    #[error("Invalid redirect from {url} to {location}")]
    InvalidRedirect { url: String, location: String },

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

/// Result type alias for crawl-bot operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

// Re-export commonly used types
pub use crate::config::{Config, CrawlerOptions, FilterConfig};
pub use crate::crawler::{
    CrawlPage, CrawlRequest, Crawler, Executor, FetchRequest, FetchResponse, HttpTransport,
    QueueTask, ReqwestTransport,
};
pub use crate::state::Frontier;
pub use crate::url::UrlFilter;
