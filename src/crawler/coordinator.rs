//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that coordinates all aspects of
//! the harvesting process, including:
//! - Processing the seed and then running a bounded pool of workers
//! - Gating each target through robots.txt, the response cache and the
//!   rate governor
//! - Retrying transient fetch failures
//! - Classifying responses and links, and emitting PDFs exactly once

use crate::config::Config;
use crate::crawler::classifier::{Classification, ContentKind, PdfClassifier, Subject};
use crate::crawler::fetcher::{FetchError, FetchResult, Fetcher, HttpFetcher};
use crate::crawler::frontier::{CrawlTarget, Frontier, StopHandle, TargetKind};
use crate::crawler::governor::RateGovernor;
use crate::crawler::parser::extract_links;
use crate::output::{Counter, CrawlStats, CrawlSummary};
use crate::robots::RobotsGate;
use crate::state::TargetState;
use crate::storage::{ArtifactSink, FsSink, PdfArtifact, ResponseCache};
use crate::url::{normalize_url, AllowedDomains};
use crate::HarvestError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

/// Why a target was dropped without producing anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// robots.txt disallows the URL
    Robots,
    /// A page redirected outside the allowed domains
    OffSite,
    /// The response is neither HTML nor PDF
    UnexpectedContent,
    /// The artifact is already under the store root
    AlreadyStored,
    /// A PDF response whose URL was already emitted
    DuplicatePdf,
}

/// The result of processing one target
#[derive(Debug)]
pub enum TargetOutcome {
    /// An HTML response was parsed and `enqueued` new targets were added
    Extracted { enqueued: usize },
    /// A PDF was handed to the sink
    Emitted { written: bool },
    Skipped(SkipReason),
    /// The fetch failed after exhausting the retry budget
    Failed(FetchError),
}

/// State shared by every worker
struct CrawlContext {
    config: Config,
    allowed: AllowedDomains,
    classifier: PdfClassifier,
    frontier: Arc<Frontier>,
    governor: RateGovernor,
    robots: Option<RobotsGate>,
    cache: Option<ResponseCache>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn ArtifactSink>,
    stats: CrawlStats,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    ctx: CrawlContext,
}

impl Coordinator {
    /// Creates a coordinator around an arbitrary fetcher and sink
    pub fn new(config: Config, fetcher: Arc<dyn Fetcher>, sink: Arc<dyn ArtifactSink>) -> Self {
        let robots = config
            .crawler
            .obey_robots
            .then(|| RobotsGate::new(config.user_agent.crawler_name.clone()));

        Self {
            ctx: CrawlContext {
                allowed: AllowedDomains::new(&config.site.allowed_domains),
                classifier: PdfClassifier::new(&config.site.document_dirs),
                frontier: Arc::new(Frontier::new()),
                governor: RateGovernor::from_config(&config.crawler, &config.throttle),
                robots,
                cache: None,
                fetcher,
                sink,
                stats: CrawlStats::new(),
                config,
            },
        }
    }

    /// Wires the HTTP fetcher, the filesystem sink, and the response cache
    /// when one is configured
    pub fn from_config(config: Config) -> Result<Self, HarvestError> {
        let fetcher = HttpFetcher::from_config(&config.crawler, &config.user_agent)?;
        let sink = FsSink::new(config.output.store_root.clone());
        let cache = config
            .output
            .cache_dir
            .as_deref()
            .map(|dir| ResponseCache::open(dir, config.output.cache_expiration))
            .transpose()?;

        let coordinator = Self::new(config, Arc::new(fetcher), Arc::new(sink));
        Ok(match cache {
            Some(cache) => coordinator.with_cache(cache),
            None => coordinator,
        })
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.ctx.cache = Some(cache);
        self
    }

    /// Drops every cached response; returns how many were removed
    pub fn clear_cache(&self) -> Result<usize, HarvestError> {
        match &self.ctx.cache {
            Some(cache) => cache.clear(),
            None => Ok(0),
        }
    }

    /// Returns a handle that stops the crawl from another task
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(self.ctx.frontier.clone())
    }

    /// Runs the crawl to completion (or until stopped)
    ///
    /// The seed is processed first, inline; if it cannot be fetched the run
    /// fails with `SeedUnreachable`. Afterwards `concurrency` workers drain
    /// the frontier. Every other failure is logged and counted.
    pub async fn run(self) -> Result<CrawlSummary, HarvestError> {
        let started = Instant::now();
        let ctx = Arc::new(self.ctx);

        let seed_url = normalize_url(&ctx.config.site.seed)?;
        let seed = CrawlTarget::page(seed_url.clone(), 0);
        ctx.frontier.offer(&seed.url);

        info!(
            seed = %seed_url,
            concurrency = ctx.config.crawler.concurrency,
            depth_limit = ctx.config.crawler.depth_limit,
            "crawl started"
        );

        if ctx.frontier.is_stopped() {
            info!(seed = %seed_url, "stopped before the seed was fetched");
        } else {
            match ctx.process(&seed).await? {
                TargetOutcome::Failed(source) => {
                    return Err(HarvestError::SeedUnreachable {
                        url: seed_url.to_string(),
                        source,
                    });
                }
                outcome => ctx.fold(&seed, outcome),
            }
        }

        let mut workers = JoinSet::new();
        for id in 0..ctx.config.crawler.concurrency.max(1) {
            let ctx = ctx.clone();
            workers.spawn(async move { ctx.work(id).await });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker task failed");
            }
        }

        if ctx.frontier.is_stopped() {
            ctx.stats.mark_cancelled();
        }

        let summary = ctx.stats.summary(started.elapsed());
        info!(
            pages = summary.pages_fetched,
            documents = summary.documents_fetched,
            pdfs = summary.pdfs_written,
            failed = summary.failed,
            cancelled = summary.cancelled,
            elapsed_secs = summary.elapsed.as_secs(),
            "crawl finished"
        );

        Ok(summary)
    }
}

/// Calls `Frontier::complete` even if processing panics
struct ActiveGuard<'a>(&'a Frontier);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.complete();
    }
}

impl CrawlContext {
    async fn work(&self, id: u32) {
        debug!(worker = id, "worker started");

        while let Some(target) = self.frontier.next().await {
            let _active = ActiveGuard(&self.frontier);

            match self.process(&target).await {
                Ok(outcome) => self.fold(&target, outcome),
                Err(e) => {
                    error!(url = %target.url, error = %e, "target processing aborted");
                    self.stats.bump(Counter::Failed);
                }
            }
        }

        debug!(worker = id, "worker finished");
    }

    /// Folds an outcome into the run statistics
    fn fold(&self, target: &CrawlTarget, outcome: TargetOutcome) {
        match outcome {
            TargetOutcome::Extracted { enqueued } => {
                debug!(url = %target.url, enqueued, "links extracted");
            }
            TargetOutcome::Emitted { written } => {
                self.stats.bump(Counter::PdfsEmitted);
                self.stats.bump(if written {
                    Counter::PdfsWritten
                } else {
                    Counter::WriteFailures
                });
            }
            TargetOutcome::Skipped(reason) => {
                debug!(url = %target.url, ?reason, "target skipped");
                if reason == SkipReason::Robots {
                    self.stats.bump(Counter::RobotsDenied);
                }
                self.stats.bump(Counter::Skipped);
            }
            TargetOutcome::Failed(e) => {
                warn!(url = %target.url, error = %e, "target failed");
                self.stats.bump(Counter::Failed);
            }
        }
    }

    /// Walks one target through its state machine
    async fn process(&self, target: &CrawlTarget) -> Result<TargetOutcome, HarvestError> {
        let state = TargetState::Discovered;

        if target.kind == TargetKind::Document && self.config.crawler.skip_existing {
            let artifact = PdfArtifact::from_url(&target.url);
            if self.sink.contains(&artifact).await {
                advance(target, state, TargetState::Skipped)?;
                return Ok(TargetOutcome::Skipped(SkipReason::AlreadyStored));
            }
        }

        if let Some(gate) = &self.robots {
            let verdict = gate.check(&target.url, &PoliteFetcher(self)).await;
            if let Some(delay) = verdict.crawl_delay {
                self.governor.raise_floor(delay);
            }
            if !verdict.allowed {
                advance(target, state, TargetState::Skipped)?;
                return Ok(TargetOutcome::Skipped(SkipReason::Robots));
            }
        }

        let state = advance(target, state, TargetState::Fetching)?;
        let response = match self.fetch(&target.url).await {
            Ok(response) => response,
            Err(e) => {
                advance(target, state, TargetState::Failed)?;
                return Ok(TargetOutcome::Failed(e));
            }
        };
        let state = advance(target, state, TargetState::Fetched)?;

        self.stats.bump(match target.kind {
            TargetKind::Page => Counter::PagesFetched,
            TargetKind::Document => Counter::DocumentsFetched,
        });

        let outcome = match target.kind {
            TargetKind::Page => self.handle_page(target, &response).await,
            TargetKind::Document => self.handle_document(target, &response).await,
        };

        let terminal = match outcome {
            TargetOutcome::Skipped(_) => TargetState::Skipped,
            _ => TargetState::Extracted,
        };
        advance(target, state, terminal)?;

        Ok(outcome)
    }

    async fn handle_page(&self, target: &CrawlTarget, response: &FetchResult) -> TargetOutcome {
        let content_type = response.content_type.as_deref();
        let classification = self.classifier.classify(Subject::Response {
            url: &response.final_url,
            content_type,
        });

        if let Classification::IsPdf(evidence) = classification {
            if !self.frontier.offer_pdf(&response.final_url) {
                return TargetOutcome::Skipped(SkipReason::DuplicatePdf);
            }
            debug!(url = %response.final_url, ?evidence, "page response is a pdf");
            return self.emit(&response.final_url, &response.body).await;
        }

        if ContentKind::of(content_type) == ContentKind::Other {
            return TargetOutcome::Skipped(SkipReason::UnexpectedContent);
        }

        self.follow_links(target, response)
    }

    async fn handle_document(&self, target: &CrawlTarget, response: &FetchResult) -> TargetOutcome {
        match ContentKind::of(response.content_type.as_deref()) {
            ContentKind::Pdf | ContentKind::Generic => self.emit(&target.url, &response.body).await,
            ContentKind::Html => {
                debug!(url = %target.url, "document turned out to be html");
                self.follow_links(target, response)
            }
            ContentKind::Other => TargetOutcome::Skipped(SkipReason::UnexpectedContent),
        }
    }

    /// Extracts links from an HTML response and enqueues the new ones
    fn follow_links(&self, target: &CrawlTarget, response: &FetchResult) -> TargetOutcome {
        if !self.allowed.contains_url(&response.final_url) {
            return TargetOutcome::Skipped(SkipReason::OffSite);
        }

        let depth_limit = self.config.crawler.depth_limit;
        if depth_limit != 0 && target.depth >= depth_limit {
            return TargetOutcome::Extracted { enqueued: 0 };
        }

        let links = extract_links(&response.text(), &response.final_url, &self.allowed);
        let depth = target.depth + 1;
        let mut enqueued = 0;

        for link in links {
            let next = match self.classifier.classify(Subject::Link(&link)) {
                Classification::IsPdf(_) if self.frontier.offer_pdf(&link) => {
                    CrawlTarget::document(link, depth)
                }
                Classification::NotPdf if self.frontier.offer(&link) => {
                    CrawlTarget::page(link, depth)
                }
                _ => continue,
            };
            self.frontier.push(next);
            enqueued += 1;
        }

        TargetOutcome::Extracted { enqueued }
    }

    /// Hands a PDF body to the sink; failures are reported, never fatal
    async fn emit(&self, source: &Url, body: &[u8]) -> TargetOutcome {
        let artifact = PdfArtifact::from_url(source);

        match self.sink.persist(&artifact, body).await {
            Ok(path) => {
                info!(url = %source, path = %path.display(), bytes = body.len(), "pdf harvested");
                TargetOutcome::Emitted { written: true }
            }
            Err(e) => {
                warn!(url = %source, error = %e, "failed to store pdf");
                TargetOutcome::Emitted { written: false }
            }
        }
    }

    /// Fetches through the cache, the governor and the retry policy
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        if let Some(cache) = &self.cache {
            match cache.get(url) {
                Ok(Some(hit)) => {
                    debug!(%url, "served from cache");
                    self.stats.bump(Counter::CacheHits);
                    return Ok(hit);
                }
                Ok(None) => {}
                Err(e) => warn!(%url, error = %e, "cache lookup failed"),
            }
        }

        let retry_budget = self.config.crawler.retry_budget;
        let mut attempt = 0;

        loop {
            let slot = self
                .governor
                .acquire_slot()
                .await
                .ok_or_else(|| FetchError::Other("rate governor closed".to_string()))?;

            let started = Instant::now();
            let result = self.fetcher.fetch(url).await;
            let latency = started.elapsed();
            drop(slot);

            match result {
                Ok(response) => {
                    self.governor.record(latency);
                    if let Some(cache) = &self.cache {
                        if let Err(e) = cache.put(&response) {
                            warn!(%url, error = %e, "failed to cache response");
                        }
                    }
                    return Ok(response);
                }
                Err(e) => {
                    self.governor.record_error(latency);

                    if !e.is_retryable() || attempt >= retry_budget || self.frontier.is_stopped() {
                        return Err(e);
                    }

                    attempt += 1;
                    let wait = self.governor.backoff(attempt);
                    warn!(
                        %url,
                        attempt,
                        retry_budget,
                        wait_ms = wait.as_millis() as u64,
                        error = %e,
                        "retrying fetch"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// Routes robots.txt requests through the crawl's cache and governor
struct PoliteFetcher<'a>(&'a CrawlContext);

#[async_trait]
impl Fetcher for PoliteFetcher<'_> {
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        self.0.fetch(url).await
    }
}

fn advance(
    target: &CrawlTarget,
    from: TargetState,
    to: TargetState,
) -> Result<TargetState, HarvestError> {
    let next = from.transition(to)?;
    debug!(url = %target.url, %from, %to, "state change");
    Ok(next)
}
