//! Frontier and de-duplication store
//!
//! The frontier is the shared FIFO work queue plus the set of URLs already
//! claimed. Workers pull targets with `next()` and report back with
//! `complete()`; the crawl is over when the queue is empty and nobody is
//! still working, or when the stop signal is raised.

use crate::url::dedup_key;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use url::Url;

/// How a frontier entry should be treated once fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// An HTML page (or anything not yet known to be a PDF)
    Page,
    /// A link speculatively classified as a PDF download
    Document,
}

/// A unit of work in the frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: Url,
    pub depth: u32,
    pub kind: TargetKind,
}

impl CrawlTarget {
    pub fn page(url: Url, depth: u32) -> Self {
        Self {
            url,
            depth,
            kind: TargetKind::Page,
        }
    }

    pub fn document(url: Url, depth: u32) -> Self {
        Self {
            url,
            depth,
            kind: TargetKind::Document,
        }
    }
}

/// Presence marks for a normalized URL
#[derive(Debug, Default, Clone, Copy)]
struct Marks {
    visited: bool,
    emitted: bool,
}

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<CrawlTarget>,
    active: usize,
}

#[derive(Debug, Default)]
pub struct Frontier {
    marks: Mutex<HashMap<String, Marks>>,
    state: Mutex<QueueState>,
    notify: Notify,
    stopped: AtomicBool,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a URL for visiting; true exactly once per normalized URL
    pub fn offer(&self, url: &Url) -> bool {
        self.claim(url, |marks| &mut marks.visited)
    }

    /// Claims a URL for PDF emission; true exactly once per normalized URL
    pub fn offer_pdf(&self, url: &Url) -> bool {
        self.claim(url, |marks| &mut marks.emitted)
    }

    fn claim(&self, url: &Url, mark: impl FnOnce(&mut Marks) -> &mut bool) -> bool {
        let mut marks = lock(&self.marks);
        let flag = mark(marks.entry(dedup_key(url)).or_default());
        !std::mem::replace(flag, true)
    }

    /// Appends a target to the back of the queue and wakes idle workers
    pub fn push(&self, target: CrawlTarget) {
        lock(&self.state).queue.push_back(target);
        self.notify.notify_waiters();
    }

    /// Returns the next target, waiting while other workers may still add more
    ///
    /// Returns `None` once the queue is empty with no active workers, or
    /// after `stop()`. Every `Some` must be paired with a `complete()` call.
    pub async fn next(&self) -> Option<CrawlTarget> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_stopped() {
                return None;
            }

            {
                let mut state = lock(&self.state);
                if let Some(target) = state.queue.pop_front() {
                    state.active += 1;
                    return Some(target);
                }
                if state.active == 0 {
                    drop(state);
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks the end of one target's processing
    pub fn complete(&self) {
        {
            let mut state = lock(&self.state);
            state.active = state.active.saturating_sub(1);
            if state.active > 0 || !state.queue.is_empty() {
                return;
            }
        }
        self.notify.notify_waiters();
    }

    /// Raises the stop signal; no target is handed out after this
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Number of targets waiting in the queue
    pub fn len(&self) -> usize {
        lock(&self.state).queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct normalized URLs seen by either set
    pub fn seen_count(&self) -> usize {
        lock(&self.marks).len()
    }
}

/// Clonable handle that stops a running crawl
#[derive(Debug, Clone)]
pub struct StopHandle {
    frontier: Arc<Frontier>,
}

impl StopHandle {
    pub(crate) fn new(frontier: Arc<Frontier>) -> Self {
        Self { frontier }
    }

    pub fn stop(&self) {
        self.frontier.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.frontier.is_stopped()
    }
}

// The guarded data stays consistent across a panic: every critical section
// is a single insert or pop.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
