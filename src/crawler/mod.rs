//! Crawler module for site traversal and PDF harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind an object-safe `Fetcher` seam
//! - HTML parsing and link extraction
//! - PDF classification of responses and links
//! - The deduplicating frontier and the adaptive rate governor
//! - Overall crawl coordination

mod classifier;
mod coordinator;
mod fetcher;
mod frontier;
mod governor;
mod parser;

pub use classifier::{Classification, ContentKind, Evidence, PdfClassifier, Subject};
pub use coordinator::{Coordinator, SkipReason, TargetOutcome};
pub use fetcher::{build_http_client, FetchError, FetchResult, Fetcher, HttpFetcher};
pub use frontier::{CrawlTarget, Frontier, StopHandle, TargetKind};
pub use governor::{RateGovernor, RateState, Slot};
pub use parser::extract_links;
