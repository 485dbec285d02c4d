//! crawl-bot main entry point
//!
//! This is the command-line interface for the crawl-bot recursive crawler.

use clap::Parser;
use crawl_bot::config::{load_config_with_hash, validate, Config};
use crawl_bot::{CrawlError, CrawlPage, CrawlRequest, Crawler, UrlFilter};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// crawl-bot: a rate-limited recursive web crawler
///
/// crawl-bot fetches the seed page, follows its links up to the configured
/// depth and prints one line per crawled URL. Request concurrency and request
/// rate are bounded, and URLs are never fetched twice.
#[derive(Parser, Debug)]
#[command(name = "crawl-bot")]
#[command(version = "1.0.0")]
#[command(about = "A rate-limited recursive web crawler", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "SEED")]
    seed: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of hops from the seed (negative values mean zero)
    #[arg(short, long, allow_negative_numbers = true)]
    depth: Option<i64>,

    /// User-Agent header sent with every request
    #[arg(long)]
    user_agent: Option<String>,

    /// Maximum number of requests in flight at once
    #[arg(long)]
    max_concurrent_requests: Option<usize>,

    /// Maximum number of requests started per second
    #[arg(long)]
    max_requests_per_second: Option<u32>,

    /// Only follow absolute links
    #[arg(long)]
    ignore_relative: bool,

    /// Stay on the seed's host
    #[arg(long)]
    same_host: bool,

    /// Only crawl matching domains (repeatable, `*.example.com` wildcards)
    #[arg(long, value_name = "PATTERN")]
    allow: Vec<String>,

    /// Never crawl matching domains (repeatable, wins over --allow)
    #[arg(long, value_name = "PATTERN")]
    deny: Vec<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    // Reject a malformed seed before anything is queued
    url::Url::parse(&cli.seed).map_err(CrawlError::from)?;

    handle_crawl(config, cli.seed).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_bot=info,warn"),
            1 => EnvFilter::new("crawl_bot=debug,info"),
            2 => EnvFilter::new("crawl_bot=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file, if any, and applies command-line overrides
fn build_config(cli: &Cli) -> Result<Config, CrawlError> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let crawler = &mut config.crawler;
    if let Some(depth) = cli.depth {
        *crawler = crawler.clone().with_depth(depth);
    }
    if let Some(user_agent) = &cli.user_agent {
        crawler.user_agent = user_agent.clone();
    }
    if let Some(max) = cli.max_concurrent_requests {
        crawler.max_concurrent_requests = max;
    }
    if let Some(rate) = cli.max_requests_per_second {
        crawler.max_requests_per_second = rate;
    }
    crawler.ignore_relative_links |= cli.ignore_relative;

    let filter = &mut config.filter;
    filter.same_host |= cli.same_host;
    filter.allow.extend(cli.allow.iter().cloned());
    filter.deny.extend(cli.deny.iter().cloned());

    validate(&config)?;
    Ok(config)
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, seed: String) -> Result<(), Box<dyn std::error::Error>> {
    let filter = UrlFilter::from_config(&config.filter, &seed).map_err(CrawlError::from)?;
    let mut crawler = Crawler::new(config.crawler)?.with_url_filter(filter);

    let request = CrawlRequest::new(seed)
        .on_success(|page: CrawlPage| {
            println!("{} {}", page.status.unwrap_or_default(), page.url);
        })
        .on_failure(|page: CrawlPage| {
            let reason = match (&page.error, page.status) {
                (Some(error), _) => error.to_string(),
                (None, Some(status)) => format!("HTTP {}", status),
                (None, None) => "no response".to_string(),
            };
            println!("ERR {} {}", page.url, reason);
        });

    let start_time = Instant::now();
    let crawled = crawler.crawl(request).await;
    println!("crawled {} urls in {:?}", crawled.len(), start_time.elapsed());

    Ok(())
}
