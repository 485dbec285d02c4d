use std::collections::HashSet;

/// Dedup and completion bookkeeping for a crawler
///
/// The frontier keeps three URL collections:
/// - `known`: every URL observed as fetched, including each hop of a redirect
///   chain. Only [`Frontier::forget`] removes entries.
/// - `crawled`: URLs whose terminal outcome was reported, in report order.
/// - `pending`: URLs submitted for fetching and not yet resolved. The crawl
///   is finished exactly when this set is empty.
///
/// It also counts the requests currently executing, which the executor's
/// admission check reads to cap concurrency.
#[derive(Debug, Default)]
pub struct Frontier {
    known: HashSet<String>,
    crawled: Vec<String>,
    pending: HashSet<String>,
    in_flight: usize,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the URL has already been observed
    pub fn is_known(&self, url: &str) -> bool {
        self.known.contains(url)
    }

    /// Returns true if a fetch for the URL is queued or in flight
    pub fn is_pending(&self, url: &str) -> bool {
        self.pending.contains(url)
    }

    /// Records a URL as observed
    pub fn mark_known(&mut self, url: impl Into<String>) {
        self.known.insert(url.into());
    }

    /// Adds a URL to the pending set
    pub fn start(&mut self, url: impl Into<String>) {
        self.pending.insert(url.into());
    }

    /// Removes a URL from the pending set
    pub fn finish(&mut self, url: &str) {
        self.pending.remove(url);
    }

    /// Returns true if nothing is pending
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty()
    }

    /// Appends a URL whose outcome has been reported
    pub fn record_crawled(&mut self, url: impl Into<String>) {
        self.crawled.push(url.into());
    }

    /// URLs whose outcome has been reported, in report order
    pub fn crawled(&self) -> &[String] {
        &self.crawled
    }

    /// Every URL observed so far
    pub fn known(&self) -> &HashSet<String> {
        &self.known
    }

    /// Counts a request as started
    pub fn request_started(&mut self) {
        self.in_flight += 1;
    }

    /// Counts a request as finished
    pub fn request_finished(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
    }

    /// Number of requests currently executing
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Clears the known and crawled URLs so a later crawl can revisit them
    pub fn forget(&mut self) {
        self.known.clear();
        self.crawled.clear();
    }
}
