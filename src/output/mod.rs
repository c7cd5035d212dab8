//! Output module for run statistics and reports
//!
//! This module handles:
//! - Lock-free counters updated by crawl workers
//! - The final `CrawlSummary` printed to the console
//! - An optional markdown report of the run

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary, RunReport};
pub use stats::{print_summary, Counter, CrawlStats, CrawlSummary};
