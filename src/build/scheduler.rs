//! Build scheduler with priority queue.
//!
//! Single entry point for all build requests:
//! - Startup scan → Background priority
//! - File change → Changed priority
//! - File change in a directory with live widgets → Live priority
//!
//! At most one pending request per directory: resubmitting a pending
//! directory only upgrades its priority. A directory leaves the pending set
//! when a worker picks it up, so an edit made during a build queues exactly
//! one follow-up build.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::core::BuildPriority;

/// Cloneable handle to a shared build queue.
#[derive(Clone, Default)]
pub struct BuildQueue {
    inner: Arc<QueueInner>,
}

#[derive(Default)]
struct QueueInner {
    /// Priority queue of pending jobs (may hold superseded entries)
    heap: Mutex<BinaryHeap<Job>>,
    /// Pending directory → current priority (dedup + upgrade)
    pending: DashMap<PathBuf, BuildPriority>,
    /// Worker wake-up
    notify: Notify,
    /// FIFO tie-breaker
    seq: AtomicU64,
    shutdown: AtomicBool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub dir: PathBuf,
    pub priority: BuildPriority,
    seq: u64,
}

// Job ordering: higher priority first, then earlier submission
impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl BuildQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a build. Returns `true` if a new heap entry was pushed
    /// (new directory or priority upgrade).
    pub fn submit(&self, dir: PathBuf, priority: BuildPriority) -> bool {
        if self.is_shutdown() {
            return false;
        }
        let pushed = match self.inner.pending.entry(dir.clone()) {
            Entry::Occupied(mut e) => {
                if priority > *e.get() {
                    e.insert(priority);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(e) => {
                e.insert(priority);
                true
            }
        };

        if pushed {
            let seq = self.inner.seq.fetch_add(1, AtomicOrdering::SeqCst);
            self.inner.heap.lock().push(Job { dir, priority, seq });
            self.inner.notify.notify_one();
        }
        pushed
    }

    /// Pop the best job whose pending entry is still current.
    pub fn try_next(&self) -> Option<Job> {
        let mut heap = self.inner.heap.lock();
        while let Some(job) = heap.pop() {
            // Superseded entries (after upgrade) no longer match pending
            if self
                .inner
                .pending
                .remove_if(&job.dir, |_, p| *p == job.priority)
                .is_some()
            {
                return Some(job);
            }
        }
        None
    }

    /// Wait for the next job. `None` once shut down.
    pub async fn next(&self) -> Option<Job> {
        loop {
            if self.is_shutdown() {
                return None;
            }
            let notified = self.inner.notify.notified();
            if let Some(job) = self.try_next() {
                return Some(job);
            }
            notified.await;
        }
    }

    pub fn is_pending(&self, dir: &Path) -> bool {
        self.inner.pending.contains_key(dir)
    }

    pub fn pending_len(&self) -> usize {
        self.inner.pending.len()
    }

    /// Drop a pending request (directory removed).
    pub fn cancel(&self, dir: &Path) {
        self.inner.pending.remove(dir);
    }

    /// Signal shutdown and wake all waiting workers.
    pub fn shutdown(&self) {
        self.inner.shutdown.store(true, AtomicOrdering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.shutdown.load(AtomicOrdering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn test_priority_then_fifo() {
        let queue = BuildQueue::new();
        queue.submit(p("/w/a"), BuildPriority::Background);
        queue.submit(p("/w/b"), BuildPriority::Changed);
        queue.submit(p("/w/c"), BuildPriority::Live);
        queue.submit(p("/w/d"), BuildPriority::Changed);

        let order: Vec<_> = std::iter::from_fn(|| queue.try_next())
            .map(|j| j.dir)
            .collect();
        assert_eq!(order, vec![p("/w/c"), p("/w/b"), p("/w/d"), p("/w/a")]);
    }

    #[test]
    fn test_one_pending_per_directory() {
        let queue = BuildQueue::new();
        assert!(queue.submit(p("/w/a"), BuildPriority::Changed));
        assert!(!queue.submit(p("/w/a"), BuildPriority::Changed));
        assert!(!queue.submit(p("/w/a"), BuildPriority::Background));
        assert_eq!(queue.pending_len(), 1);

        assert!(queue.try_next().is_some());
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn test_upgrade_skips_superseded_entry() {
        let queue = BuildQueue::new();
        queue.submit(p("/w/a"), BuildPriority::Background);
        queue.submit(p("/w/b"), BuildPriority::Changed);
        assert!(queue.submit(p("/w/a"), BuildPriority::Live));

        let first = queue.try_next().unwrap();
        assert_eq!(first.dir, p("/w/a"));
        assert_eq!(first.priority, BuildPriority::Live);
        assert_eq!(queue.try_next().unwrap().dir, p("/w/b"));
        // The original Background entry for /w/a was discarded
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn test_resubmit_after_pickup() {
        let queue = BuildQueue::new();
        queue.submit(p("/w/a"), BuildPriority::Changed);
        let _running = queue.try_next().unwrap();
        assert!(!queue.is_pending(&p("/w/a")));
        assert!(queue.submit(p("/w/a"), BuildPriority::Changed));
    }

    #[test]
    fn test_cancel() {
        let queue = BuildQueue::new();
        queue.submit(p("/w/a"), BuildPriority::Changed);
        queue.cancel(&p("/w/a"));
        assert!(queue.try_next().is_none());
    }

    #[tokio::test]
    async fn test_next_wakes_on_submit() {
        let queue = BuildQueue::new();
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.submit(p("/w/a"), BuildPriority::Changed);

        let job = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.unwrap().dir, p("/w/a"));
    }

    #[tokio::test]
    async fn test_shutdown_releases_workers() {
        let queue = BuildQueue::new();
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.shutdown();

        let job = tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(job.is_none());
        assert!(!queue.submit(p("/w/a"), BuildPriority::Live));
    }
}
