use serde::{Deserialize, Deserializer};

/// Default number of hops followed from the seed URL
pub const DEFAULT_CRAWL_DEPTH: u32 = 5;

/// Default number of fetches allowed to be in flight at once
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 5;

/// Default number of fetch dispatches per second
pub const DEFAULT_MAX_REQUESTS_PER_SECOND: u32 = 5;

/// Default `User-Agent` header value
pub const DEFAULT_USER_AGENT: &str = "crawl-bot/1.0";

/// Main configuration structure for crawl-bot
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerOptions,

    #[serde(default)]
    pub filter: FilterConfig,
}

/// Crawl behavior options
///
/// Every field has a default so a config file only needs to name the
/// settings it changes.
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerOptions {
    /// Maximum hop count from the seed URL (negative values clamp to 0)
    #[serde(default = "default_depth", deserialize_with = "clamped_depth")]
    pub depth: u32,

    /// Value of the `User-Agent` header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum number of fetches outstanding at the same time
    #[serde(
        rename = "max-concurrent-requests",
        default = "default_max_concurrent_requests"
    )]
    pub max_concurrent_requests: usize,

    /// Maximum number of fetch dispatches per second
    #[serde(
        rename = "max-requests-per-second",
        default = "default_max_requests_per_second"
    )]
    pub max_requests_per_second: u32,

    /// Only follow absolute links that carry a scheme
    #[serde(rename = "ignore-relative-links", default)]
    pub ignore_relative_links: bool,

    /// Skip TLS certificate verification
    #[serde(rename = "accept-invalid-certs", default = "default_true")]
    pub accept_invalid_certs: bool,

    /// Per-request timeout applied by the reqwest transport (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Maximum redirect hops the reqwest transport follows
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for CrawlerOptions {
    fn default() -> Self {
        Self {
            depth: DEFAULT_CRAWL_DEPTH,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            max_requests_per_second: DEFAULT_MAX_REQUESTS_PER_SECOND,
            ignore_relative_links: false,
            accept_invalid_certs: true,
            request_timeout: default_request_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl CrawlerOptions {
    /// Sets the depth from a signed value, clamping negatives to zero
    pub fn with_depth(mut self, depth: i64) -> Self {
        self.depth = clamp_depth(depth);
        self
    }

    /// Replaces unset (zero or empty) limits with their defaults
    ///
    /// A zero concurrency cap or rate would stall the crawl forever, so they
    /// are treated as "not configured".
    pub fn normalized(mut self) -> Self {
        if self.max_concurrent_requests == 0 {
            self.max_concurrent_requests = DEFAULT_MAX_CONCURRENT_REQUESTS;
        }
        if self.max_requests_per_second == 0 {
            self.max_requests_per_second = DEFAULT_MAX_REQUESTS_PER_SECOND;
        }
        if self.user_agent.trim().is_empty() {
            self.user_agent = DEFAULT_USER_AGENT.to_string();
        }
        self
    }
}

/// Domain filter configuration, compiled into a `should_crawl_url` predicate
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Domain patterns to crawl (e.g., "example.com" or "*.example.com").
    /// An empty list allows every domain.
    #[serde(default)]
    pub allow: Vec<String>,

    /// Domain patterns never to crawl; these win over `allow`
    #[serde(default)]
    pub deny: Vec<String>,

    /// Restrict the crawl to the host of the seed URL
    #[serde(rename = "same-host", default)]
    pub same_host: bool,
}

fn default_depth() -> u32 {
    DEFAULT_CRAWL_DEPTH
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_max_concurrent_requests() -> usize {
    DEFAULT_MAX_CONCURRENT_REQUESTS
}

fn default_max_requests_per_second() -> u32 {
    DEFAULT_MAX_REQUESTS_PER_SECOND
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

pub(crate) fn clamp_depth(depth: i64) -> u32 {
    depth.clamp(0, i64::from(u32::MAX)) as u32
}

fn clamped_depth<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let depth = i64::deserialize(deserializer)?;
    Ok(clamp_depth(depth))
}
