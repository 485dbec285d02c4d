//! Crawl orchestration
//!
//! This module contains the crawl loop that ties everything together:
//! - Deduplicating URLs across redirect chains
//! - Depth-limited expansion of extracted links
//! - Feeding fetch tasks to the rate-limited [`Executor`]
//! - Interpreting fetch results and reporting them to the caller
//! - Detecting when the frontier has drained
//!
//! A crawl run is a single-owner event loop. Every fetch runs as its own
//! tokio task and reports back over a channel, so all frontier state is only
//! ever touched by the loop itself and needs no locking.

use crate::config::CrawlerOptions;
use crate::crawler::fetcher::{FetchRequest, FetchResponse, HttpTransport, ReqwestTransport};
use crate::crawler::parser::{
    decode_body, extract_links, is_text_content, LinkOptions, BINARY_PLACEHOLDER,
};
use crate::crawler::scheduler::{Executor, QueueTask};
use crate::state::Frontier;
use crate::url::{canonicalize_url, UrlFilter};
use crate::{CrawlError, TransportError, TransportResult};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Shared URL predicate
pub type UrlPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Callback receiving one terminal page outcome
pub type PageHandler = Box<dyn FnMut(CrawlPage) + Send>;

/// Callback receiving every reported URL once the crawl has drained
pub type FinishedHandler = Box<dyn FnOnce(&[String]) + Send>;

/// The outcome of one crawled URL, as handed to the success and failure
/// callbacks
#[derive(Debug)]
pub struct CrawlPage {
    /// The effective URL on success, the requested URL on failure
    pub url: String,

    /// HTTP status, `None` if no response was obtained
    pub status: Option<u16>,

    /// Decoded text, or [`BINARY_PLACEHOLDER`] for non-HTML responses
    pub content: String,

    /// Transport failure, if any
    pub error: Option<TransportError>,

    /// The raw response, if any
    pub response: Option<FetchResponse>,

    /// URL of the page that linked here; empty for the seed
    pub referer: String,
}

impl CrawlPage {
    /// Alias of [`CrawlPage::content`]
    pub fn body(&self) -> &str {
        &self.content
    }

    /// Returns true for a 200 response
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.status == Some(200)
    }
}

/// A crawl invocation: the seed URL plus optional callbacks
///
/// Plain strings convert into a request without callbacks, which is enough
/// when only the returned list of crawled URLs matters.
///
/// ```
/// use crawl_bot::CrawlRequest;
///
/// let request = CrawlRequest::new("https://example.com/")
///     .on_success(|page| println!("{}", page.url))
///     .on_finished(|crawled| println!("{} urls", crawled.len()));
/// assert_eq!(request.url(), "https://example.com/");
/// ```
pub struct CrawlRequest {
    url: String,
    on_success: Option<PageHandler>,
    on_failure: Option<PageHandler>,
    on_finished: Option<FinishedHandler>,
}

impl CrawlRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            on_success: None,
            on_failure: None,
            on_finished: None,
        }
    }

    /// The seed URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Called once for every successfully crawled URL
    pub fn on_success(mut self, handler: impl FnMut(CrawlPage) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(handler));
        self
    }

    /// Called once for every URL that failed with a transport error or a
    /// non-200 status
    pub fn on_failure(mut self, handler: impl FnMut(CrawlPage) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(handler));
        self
    }

    /// Called exactly once when nothing is left pending
    pub fn on_finished(mut self, handler: impl FnOnce(&[String]) + Send + 'static) -> Self {
        self.on_finished = Some(Box::new(handler));
        self
    }
}

impl From<&str> for CrawlRequest {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for CrawlRequest {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

impl fmt::Debug for CrawlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrawlRequest")
            .field("url", &self.url)
            .field("on_success", &self.on_success.is_some())
            .field("on_failure", &self.on_failure.is_some())
            .field("on_finished", &self.on_finished.is_some())
            .finish()
    }
}

/// Recursive web crawler
///
/// The known and crawled URL sets survive across [`Crawler::crawl`] calls on
/// the same instance, so a second crawl skips everything the first one saw
/// until [`Crawler::forget_crawled`] is called.
pub struct Crawler {
    options: CrawlerOptions,
    should_crawl_url: UrlPredicate,
    should_crawl_links_from: UrlPredicate,
    transport: Arc<dyn HttpTransport>,
    frontier: Frontier,
}

impl Crawler {
    /// Creates a crawler fetching through a [`ReqwestTransport`]
    ///
    /// The request timeout and redirect limit are fixed here; a later
    /// [`Crawler::configure`] does not rebuild the transport.
    pub fn new(options: CrawlerOptions) -> Result<Self, CrawlError> {
        let options = options.normalized();
        let transport = ReqwestTransport::new(&options)?;
        Ok(Self::with_transport(Arc::new(transport)).configure(options))
    }

    /// Creates a crawler with default options fetching through `transport`
    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            options: CrawlerOptions::default(),
            should_crawl_url: Arc::new(|_: &str| true),
            should_crawl_links_from: Arc::new(|_: &str| true),
            transport,
            frontier: Frontier::new(),
        }
    }

    /// Replaces the crawl options
    ///
    /// Zero limits and an empty user agent fall back to their defaults.
    pub fn configure(mut self, options: CrawlerOptions) -> Self {
        self.options = options.normalized();
        self
    }

    /// Sets the predicate gating both fetching a URL and following links to it
    pub fn should_crawl_url(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_crawl_url = Arc::new(predicate);
        self
    }

    /// Uses a domain filter as the `should_crawl_url` predicate
    pub fn with_url_filter(mut self, filter: UrlFilter) -> Self {
        self.should_crawl_url = filter.into_predicate();
        self
    }

    /// Sets the predicate gating whether links of a fetched page are expanded
    pub fn should_crawl_links_from(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_crawl_links_from = Arc::new(predicate);
        self
    }

    pub fn options(&self) -> &CrawlerOptions {
        &self.options
    }

    /// Every URL observed so far, including intermediate redirect hops
    pub fn known_urls(&self) -> &HashSet<String> {
        self.frontier.known()
    }

    /// URLs reported to the callbacks so far, in report order
    pub fn crawled_urls(&self) -> &[String] {
        self.frontier.crawled()
    }

    pub fn is_known(&self, url: &str) -> bool {
        self.frontier.is_known(url)
    }

    /// Clears the known and crawled URLs so they can be crawled again
    pub fn forget_crawled(&mut self) -> &mut Self {
        self.frontier.forget();
        self
    }

    /// Crawls from a seed URL until nothing is left pending
    ///
    /// Resolves after the finished callback has run, with the crawled URLs of
    /// this crawler (earlier runs included unless forgotten). A seed that is
    /// already known, filtered out or given a depth of zero finishes
    /// immediately.
    ///
    /// A fetch that never completes keeps the crawl from ever finishing; the
    /// transport is responsible for timing requests out. Dropping the
    /// returned future mid-crawl discards the crawler's known and crawled
    /// URLs.
    pub async fn crawl(&mut self, request: impl Into<CrawlRequest>) -> Vec<String> {
        let CrawlRequest {
            url,
            on_success,
            on_failure,
            on_finished,
        } = request.into();

        let (completions, receiver) = mpsc::unbounded_channel();
        let mut run = CrawlRun {
            frontier: std::mem::take(&mut self.frontier),
            options: self.options.clone(),
            should_crawl_url: Arc::clone(&self.should_crawl_url),
            should_crawl_links_from: Arc::clone(&self.should_crawl_links_from),
            transport: Arc::clone(&self.transport),
            on_success: on_success.unwrap_or_else(|| Box::new(|_: CrawlPage| {})),
            on_failure: on_failure.unwrap_or_else(|| Box::new(|_: CrawlPage| {})),
            completions,
        };

        tracing::info!(
            "Starting crawl of {} (depth {}, {} concurrent, {}/s)",
            url,
            self.options.depth,
            self.options.max_concurrent_requests,
            self.options.max_requests_per_second
        );
        let start_time = Instant::now();
        let reported_before = run.frontier.crawled().len();

        run.drive(receiver, url).await;

        let crawled = run.frontier.crawled().to_vec();
        if let Some(on_finished) = on_finished {
            on_finished(&crawled);
        }
        self.frontier = run.frontier;

        tracing::info!(
            "Crawl finished: {} urls reported in {:?}",
            crawled.len().saturating_sub(reported_before),
            start_time.elapsed()
        );
        crawled
    }

    /// Crawls with positional callbacks
    pub async fn crawl_with(
        &mut self,
        url: impl Into<String>,
        on_success: impl FnMut(CrawlPage) + Send + 'static,
        on_failure: impl FnMut(CrawlPage) + Send + 'static,
        on_finished: impl FnOnce(&[String]) + Send + 'static,
    ) -> Vec<String> {
        let request = CrawlRequest::new(url)
            .on_success(on_success)
            .on_failure(on_failure)
            .on_finished(on_finished);
        self.crawl(request).await
    }

    /// Runs a crawl in the background
    ///
    /// Returns immediately. The handle yields the crawler back once the crawl
    /// has finished so its state can be reused.
    pub fn spawn(mut self, request: impl Into<CrawlRequest>) -> JoinHandle<Self> {
        let request = request.into();
        tokio::spawn(async move {
            self.crawl(request).await;
            self
        })
    }
}

impl fmt::Debug for Crawler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crawler")
            .field("options", &self.options)
            .field("frontier", &self.frontier)
            .finish()
    }
}

/// A fetch waiting in the executor queue or in flight
#[derive(Debug)]
struct FetchJob {
    url: String,
    referer: Option<String>,
    depth: u32,
}

/// A fetch that came back from the transport
struct Completion {
    job: FetchJob,
    outcome: TransportResult<FetchResponse>,
}

/// Everything one crawl run owns
///
/// This is the executor's task context: queued tasks get `&mut CrawlRun`
/// when dispatched.
struct CrawlRun {
    frontier: Frontier,
    options: CrawlerOptions,
    should_crawl_url: UrlPredicate,
    should_crawl_links_from: UrlPredicate,
    transport: Arc<dyn HttpTransport>,
    on_success: PageHandler,
    on_failure: PageHandler,
    completions: mpsc::UnboundedSender<Completion>,
}

impl CrawlRun {
    /// Runs the event loop until the pending set drains
    async fn drive(&mut self, mut receiver: mpsc::UnboundedReceiver<Completion>, seed: String) {
        let max_concurrent = self.options.max_concurrent_requests;
        let mut executor = Executor::new(self.options.max_requests_per_second)
            .with_admission(move |run: &CrawlRun| run.frontier.in_flight() < max_concurrent);
        executor.start();

        let depth = self.options.depth;
        self.crawl_url(&mut executor, seed, None, depth);

        while !self.frontier.is_drained() {
            tokio::select! {
                _ = executor.next_tick() => {
                    executor.tick(self);
                }
                Some(completion) = receiver.recv() => {
                    self.complete(&mut executor, completion);
                }
            }
        }

        executor.stop();
    }

    /// Queues a URL for fetching at the given remaining depth
    ///
    /// URLs are keyed by their canonical form, so a seed and a link naming
    /// the same page share one entry.
    fn crawl_url(
        &mut self,
        executor: &mut Executor<CrawlRun>,
        url: String,
        referer: Option<String>,
        depth: u32,
    ) {
        let url = canonicalize_url(&url);
        if depth == 0 || self.frontier.is_known(&url) || self.frontier.is_pending(&url) {
            return;
        }

        tracing::debug!("Queueing {} at depth {}", url, depth);
        self.frontier.start(url.clone());

        let check = url.clone();
        let job = FetchJob {
            url,
            referer,
            depth,
        };
        executor.submit(
            QueueTask::new(move |run: &mut CrawlRun| run.dispatch(job))
                .skip_if(move |run: &mut CrawlRun| run.skip_stale(&check)),
        );
    }

    /// Dispatch-time check for a queued URL
    ///
    /// A URL that became known while queued, or that the predicate now
    /// rejects, is finished without being fetched.
    fn skip_stale(&mut self, url: &str) -> bool {
        let skip = self.frontier.is_known(url) || !(self.should_crawl_url)(url);
        if skip {
            tracing::debug!("Skipping {}", url);
            self.frontier.finish(url);
        }
        skip
    }

    /// Starts the fetch of a job on its own task
    fn dispatch(&mut self, job: FetchJob) {
        self.frontier.request_started();
        tracing::debug!(
            "Fetching {} ({} in flight)",
            job.url,
            self.frontier.in_flight()
        );

        let request = FetchRequest {
            url: job.url.clone(),
            user_agent: self.options.user_agent.clone(),
            referer: job.referer.clone(),
            accept_invalid_certs: self.options.accept_invalid_certs,
        };
        let transport = Arc::clone(&self.transport);
        let completions = self.completions.clone();

        tokio::spawn(async move {
            let outcome = transport.fetch(request).await;
            // The receiver only goes away when the crawl future was dropped
            let _ = completions.send(Completion { job, outcome });
        });
    }

    /// Interprets a finished fetch
    fn complete(&mut self, executor: &mut Executor<CrawlRun>, completion: Completion) {
        let Completion { job, outcome } = completion;
        self.frontier.request_finished();

        if self.frontier.is_known(&job.url) {
            tracing::debug!("Discarding result for {}, already resolved", job.url);
            self.frontier.finish(&job.url);
            return;
        }

        let referer = job.referer.clone().unwrap_or_default();
        match outcome {
            Ok(response) => self.complete_response(executor, &job, response, referer),
            Err(error) => {
                self.frontier.mark_known(job.url.clone());
                tracing::warn!("Failed to fetch {}: {}", job.url, error);
                self.report_failure(CrawlPage {
                    url: job.url.clone(),
                    status: None,
                    content: BINARY_PLACEHOLDER.to_string(),
                    error: Some(error),
                    response: None,
                    referer,
                });
            }
        }

        // Links found above are already pending, so this cannot drain the
        // frontier while there is more to crawl.
        self.frontier.finish(&job.url);
    }

    fn complete_response(
        &mut self,
        executor: &mut Executor<CrawlRun>,
        job: &FetchJob,
        response: FetchResponse,
        referer: String,
    ) {
        let effective = canonicalize_url(&response.final_url);
        // Another chain may already have landed on the same target
        let already_reported = effective != job.url && self.frontier.is_known(&effective);

        self.frontier.mark_known(job.url.clone());
        for hop in &response.redirects {
            self.frontier.mark_known(canonicalize_url(hop));
        }

        let is_text = is_text_content(response.content_type.as_deref());
        let content = if is_text {
            decode_body(
                &response.body,
                response.content_encoding.as_deref(),
                response.content_type.as_deref(),
            )
        } else {
            BINARY_PLACEHOLDER.to_string()
        };

        if response.status != 200 {
            tracing::warn!("{} returned HTTP {}", job.url, response.status);
            self.report_failure(CrawlPage {
                url: job.url.clone(),
                status: Some(response.status),
                content,
                error: None,
                response: Some(response),
                referer,
            });
            return;
        }

        if already_reported {
            tracing::debug!("{} redirected to already crawled {}", job.url, effective);
            return;
        }
        if !(self.should_crawl_url)(&effective) {
            tracing::debug!("{} redirected to filtered {}", job.url, effective);
            return;
        }

        self.frontier.mark_known(effective.clone());
        self.frontier.record_crawled(effective.clone());

        let links = if is_text && job.depth > 1 && (self.should_crawl_links_from)(&effective) {
            extract_links(
                &effective,
                &content,
                LinkOptions {
                    ignore_relative_links: self.options.ignore_relative_links,
                    should_crawl_url: self.should_crawl_url.as_ref(),
                },
            )
        } else {
            Vec::new()
        };

        tracing::debug!("Crawled {} ({} links)", effective, links.len());
        (self.on_success)(CrawlPage {
            url: effective.clone(),
            status: Some(response.status),
            content,
            error: None,
            response: Some(response),
            referer,
        });

        for link in links {
            self.crawl_url(executor, link, Some(effective.clone()), job.depth - 1);
        }
    }

    fn report_failure(&mut self, page: CrawlPage) {
        self.frontier.record_crawled(page.url.clone());
        (self.on_failure)(page);
    }
}
