//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Frontier`: the known, pending, and crawled URL sets of a crawler plus
//!   the count of requests currently in flight

mod frontier;

// Re-export main types
pub use frontier::Frontier;
