//! Run statistics
//!
//! Workers bump lock-free counters while the crawl runs; the final
//! `CrawlSummary` is a plain snapshot of them.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// The counters tracked during a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    PagesFetched,
    DocumentsFetched,
    Failed,
    Skipped,
    PdfsEmitted,
    PdfsWritten,
    WriteFailures,
    CacheHits,
    RobotsDenied,
}

/// Shared, lock-free run counters
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_fetched: AtomicU64,
    documents_fetched: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
    pdfs_emitted: AtomicU64,
    pdfs_written: AtomicU64,
    write_failures: AtomicU64,
    cache_hits: AtomicU64,
    robots_denied: AtomicU64,
    cancelled: AtomicBool,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self, counter: Counter) {
        self.counter(counter).fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.counter(counter).load(Ordering::Relaxed)
    }

    pub fn mark_cancelled(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    fn counter(&self, counter: Counter) -> &AtomicU64 {
        match counter {
            Counter::PagesFetched => &self.pages_fetched,
            Counter::DocumentsFetched => &self.documents_fetched,
            Counter::Failed => &self.failed,
            Counter::Skipped => &self.skipped,
            Counter::PdfsEmitted => &self.pdfs_emitted,
            Counter::PdfsWritten => &self.pdfs_written,
            Counter::WriteFailures => &self.write_failures,
            Counter::CacheHits => &self.cache_hits,
            Counter::RobotsDenied => &self.robots_denied,
        }
    }

    /// Snapshots the counters into a summary
    pub fn summary(&self, elapsed: Duration) -> CrawlSummary {
        CrawlSummary {
            pages_fetched: self.get(Counter::PagesFetched),
            documents_fetched: self.get(Counter::DocumentsFetched),
            failed: self.get(Counter::Failed),
            skipped: self.get(Counter::Skipped),
            pdfs_emitted: self.get(Counter::PdfsEmitted),
            pdfs_written: self.get(Counter::PdfsWritten),
            write_failures: self.get(Counter::WriteFailures),
            cache_hits: self.get(Counter::CacheHits),
            robots_denied: self.get(Counter::RobotsDenied),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            elapsed,
        }
    }
}

/// Final statistics of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages_fetched: u64,
    pub documents_fetched: u64,
    pub failed: u64,
    pub skipped: u64,
    pub pdfs_emitted: u64,
    pub pdfs_written: u64,
    pub write_failures: u64,
    pub cache_hits: u64,
    pub robots_denied: u64,
    /// True when the run was stopped before the frontier was exhausted
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Total responses obtained, from network or cache
    pub fn total_fetched(&self) -> u64 {
        self.pages_fetched + self.documents_fetched
    }

    /// Percentage of attempted targets that failed
    pub fn failure_rate(&self) -> f64 {
        let attempted = self.total_fetched() + self.failed;
        if attempted == 0 {
            0.0
        } else {
            (self.failed as f64 / attempted as f64) * 100.0
        }
    }
}

/// Prints a summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Fetching:");
    println!("  Pages fetched: {}", summary.pages_fetched);
    println!("  Documents fetched: {}", summary.documents_fetched);
    println!("  Served from cache: {}", summary.cache_hits);
    println!(
        "  Failed: {} ({:.1}%)",
        summary.failed,
        summary.failure_rate()
    );
    println!("  Skipped: {}", summary.skipped);
    println!("  Denied by robots.txt: {}", summary.robots_denied);
    println!();

    println!("PDFs:");
    println!("  Emitted: {}", summary.pdfs_emitted);
    println!("  Written: {}", summary.pdfs_written);
    if summary.write_failures > 0 {
        println!("  Write failures: {}", summary.write_failures);
    }
    println!();

    println!(
        "{} in {:.1}s",
        if summary.cancelled {
            "Stopped early"
        } else {
            "Finished"
        },
        summary.elapsed.as_secs_f64()
    );
}
