//! Robots.txt handling module
//!
//! robots.txt is fetched once per origin, through the same `Fetcher` the
//! crawl uses, and kept for the rest of the run. A missing or unreadable
//! file allows everything.

mod parser;

pub use parser::ParsedRobots;

use crate::crawler::Fetcher;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use url::Url;

/// Result of checking one URL against robots.txt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotsVerdict {
    pub allowed: bool,
    pub crawl_delay: Option<Duration>,
}

type RobotsCell = Arc<OnceCell<Arc<ParsedRobots>>>;

/// Per-origin robots.txt gate
#[derive(Debug)]
pub struct RobotsGate {
    agent: String,
    origins: Mutex<HashMap<String, RobotsCell>>,
}

impl RobotsGate {
    /// Creates a gate matching rules for `agent` (the crawler's product token)
    pub fn new(agent: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            origins: Mutex::new(HashMap::new()),
        }
    }

    /// Checks `url`, fetching its origin's robots.txt on first use
    pub async fn check(&self, url: &Url, fetcher: &dyn Fetcher) -> RobotsVerdict {
        let robots = self.robots_for(url, fetcher).await;
        RobotsVerdict {
            allowed: robots.is_allowed(url, &self.agent),
            crawl_delay: robots.crawl_delay(&self.agent),
        }
    }

    /// Returns the parsed robots.txt for the origin of `url`
    ///
    /// Concurrent callers for the same origin share a single fetch.
    pub async fn robots_for(&self, url: &Url, fetcher: &dyn Fetcher) -> Arc<ParsedRobots> {
        let origin = url.origin().ascii_serialization();
        let cell = {
            let mut origins = self.origins.lock().unwrap_or_else(PoisonError::into_inner);
            origins.entry(origin).or_default().clone()
        };

        cell.get_or_init(|| async { Arc::new(fetch_robots(url, fetcher).await) })
            .await
            .clone()
    }
}

/// Fetches and parses robots.txt for the origin of `url`
///
/// | Response | Result |
/// |----------|--------|
/// | 2xx | parsed rules |
/// | 4xx | allow all |
/// | 5xx, network error | allow all (logged) |
pub async fn fetch_robots(url: &Url, fetcher: &dyn Fetcher) -> ParsedRobots {
    let robots_url = match url.join("/robots.txt") {
        Ok(u) => u,
        Err(e) => {
            warn!(%url, error = %e, "cannot build robots.txt URL");
            return ParsedRobots::allow_all();
        }
    };

    match fetcher.fetch(&robots_url).await {
        Ok(result) => {
            debug!(url = %robots_url, bytes = result.body.len(), "robots.txt loaded");
            ParsedRobots::from_content(&result.text())
        }
        Err(e) if e.status().is_some_and(|s| (400..500).contains(&s)) => {
            debug!(url = %robots_url, error = %e, "no robots.txt, allowing all");
            ParsedRobots::allow_all()
        }
        Err(e) => {
            warn!(url = %robots_url, error = %e, "robots.txt unavailable, allowing all");
            ParsedRobots::allow_all()
        }
    }
}
