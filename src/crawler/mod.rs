//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The fixed-rate [`Executor`] with its admission and skip checks
//! - HTTP fetching behind the [`HttpTransport`] trait
//! - Raw-text link extraction and body decoding
//! - Overall crawl coordination in [`Crawler`]
//!
//! # Example
//!
//! ```no_run
//! use crawl_bot::{CrawlRequest, Crawler, CrawlerOptions};
//!
//! # async fn run() -> crawl_bot::Result<()> {
//! let mut crawler = Crawler::new(CrawlerOptions::default().with_depth(2))?
//!     .should_crawl_url(|url| url.starts_with("https://example.com/"));
//!
//! let crawled = crawler
//!     .crawl(CrawlRequest::new("https://example.com/").on_success(|page| {
//!         println!("{} {}", page.status.unwrap_or_default(), page.url);
//!     }))
//!     .await;
//! println!("crawled {} urls", crawled.len());
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::{
    CrawlPage, CrawlRequest, Crawler, FinishedHandler, PageHandler, UrlPredicate,
};
pub use fetcher::{build_http_client, FetchRequest, FetchResponse, HttpTransport, ReqwestTransport};
pub use parser::{
    decode_body, extract_links, is_text_content, resolve_base_url, strip_comments, LinkOptions,
    BINARY_PLACEHOLDER,
};
pub use scheduler::{AdmissionFn, Executor, QueueTask, SkipFn, TaskFn, TickReport};
