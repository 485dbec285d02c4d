//! HTTP transport for the crawler
//!
//! This module defines the [`HttpTransport`] seam the crawl orchestrator
//! fetches through, and its reqwest implementation, including:
//! - Building HTTP clients with and without TLS verification
//! - `User-Agent` and `Referer` request headers
//! - Manual redirect following that records the full redirect chain
//! - Error classification
//!
//! The orchestrator has no request timeout of its own. A transport that never
//! resolves leaves its URL pending forever, so implementations must bound
//! every request themselves (the reqwest transport uses `request-timeout`).

use crate::config::CrawlerOptions;
use crate::{TransportError, TransportResult};
use async_trait::async_trait;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, LOCATION, REFERER, USER_AGENT};
use reqwest::{redirect::Policy, Client, Response};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// A single page request issued by the crawler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// The URL to fetch
    pub url: String,

    /// `User-Agent` header value
    pub user_agent: String,

    /// `Referer` header value; `None` for the seed URL
    pub referer: Option<String>,

    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

/// The terminal response of a fetch, after any redirects
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The URL originally requested
    pub requested_url: String,

    /// The URL that produced this response, in canonical form
    pub final_url: String,

    /// Each redirect target in the order it was followed
    pub redirects: Vec<String>,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value
    pub content_type: Option<String>,

    /// Content-Encoding header value
    pub content_encoding: Option<String>,

    /// Raw body bytes
    pub body: Vec<u8>,
}

impl FetchResponse {
    /// Returns true if the request was redirected at least once
    pub fn was_redirected(&self) -> bool {
        !self.redirects.is_empty()
    }
}

/// Fetches pages on behalf of the crawler
///
/// Implementations follow redirects themselves and report the whole chain in
/// [`FetchResponse::redirects`]. Both network failures and protocol failures
/// are returned as [`TransportError`] values.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> TransportResult<FetchResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    verified: Client,
    unverified: Client,
    max_redirects: usize,
}

impl ReqwestTransport {
    /// Builds the transport from crawl options
    ///
    /// Uses `request-timeout` and `max-redirects`. Whether certificates are
    /// checked is decided per request.
    pub fn new(options: &CrawlerOptions) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(options.request_timeout.max(1));
        Ok(Self {
            verified: build_http_client(timeout, false)?,
            unverified: build_http_client(timeout, true)?,
            max_redirects: options.max_redirects,
        })
    }

    fn client(&self, accept_invalid_certs: bool) -> &Client {
        if accept_invalid_certs {
            &self.unverified
        } else {
            &self.verified
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are never followed by reqwest itself so the transport can record
/// every hop of the chain.
pub fn build_http_client(
    timeout: Duration,
    accept_invalid_certs: bool,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::none())
        .danger_accept_invalid_certs(accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    /// Fetches a URL, following redirects manually
    ///
    /// # Redirect Handling
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 3xx with `Location` | Follow, record hop |
    /// | 3xx without `Location` | Returned as the final response |
    /// | Hop count > `max-redirects` | `RedirectLimit` |
    /// | Target already visited in this chain | `RedirectLoop` |
    /// | Unresolvable `Location` | `InvalidRedirect` |
    async fn fetch(&self, request: FetchRequest) -> TransportResult<FetchResponse> {
        let client = self.client(request.accept_invalid_certs);
        let mut current = Url::parse(&request.url).map_err(|e| TransportError::InvalidUrl {
            url: request.url.clone(),
            message: e.to_string(),
        })?;

        let mut redirects = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(current.to_string());

        loop {
            let mut builder = client
                .get(current.clone())
                .header(USER_AGENT, request.user_agent.as_str());
            if let Some(referer) = &request.referer {
                builder = builder.header(REFERER, referer.as_str());
            }

            let response = builder
                .send()
                .await
                .map_err(|e| classify_error(current.as_str(), e))?;

            if let Some(location) = redirect_location(&response) {
                let next = current
                    .join(&location)
                    .map_err(|_| TransportError::InvalidRedirect {
                        url: current.to_string(),
                        location: location.clone(),
                    })?;

                if redirects.len() >= self.max_redirects {
                    return Err(TransportError::RedirectLimit {
                        url: request.url.clone(),
                    });
                }
                if !visited.insert(next.to_string()) {
                    return Err(TransportError::RedirectLoop {
                        url: next.to_string(),
                    });
                }

                tracing::trace!("Redirect {} -> {}", current, next);
                redirects.push(next.to_string());
                current = next;
                continue;
            }

            let status = response.status().as_u16();
            let content_type = header_value(&response, CONTENT_TYPE);
            let content_encoding = header_value(&response, CONTENT_ENCODING);
            let body = response
                .bytes()
                .await
                .map_err(|e| classify_error(current.as_str(), e))?
                .to_vec();

            return Ok(FetchResponse {
                requested_url: request.url,
                final_url: current.to_string(),
                redirects,
                status,
                content_type,
                content_encoding,
                body,
            });
        }
    }
}

/// Returns the `Location` of a redirect response
fn redirect_location(response: &Response) -> Option<String> {
    if !response.status().is_redirection() {
        return None;
    }
    header_value(response, LOCATION)
}

fn header_value(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Maps a reqwest error onto the transport error taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        TransportError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
