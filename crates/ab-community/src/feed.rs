//! Shared state machine behind every entity feed.
//!
//! `Idle -> Loading -> Ready` on the first refresh, `Ready -> Loading -> Ready`
//! afterwards. There is no error phase: a failed refresh is logged and the
//! previous records stay in place.
//!
//! Every refresh and local insert draws a version from one counter. A
//! refresh only replaces the records when its version is newer than the
//! one the records carry, so a slow refresh that started before a toggle
//! or a create cannot bring back stale state. The phase stays `Loading`
//! until the most recently started refresh has finished.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use ab_core::{AppError, Result};
use tokio::sync::RwLock;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Ready,
}

struct Inner<V> {
    items: Vec<V>,
    phase: LoadPhase,
    // Version of the write that produced `items`.
    version: u64,
    // Version of the most recently started refresh.
    newest_refresh: u64,
}

pub(crate) struct FeedState<V> {
    inner: RwLock<Inner<V>>,
    versions: AtomicU64,
    // Cleared on teardown; results arriving afterwards are dropped.
    mounted: AtomicBool,
}

impl<V: Clone> FeedState<V> {
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                items: Vec::new(),
                phase: LoadPhase::Idle,
                version: 0,
                newest_refresh: 0,
            }),
            versions: AtomicU64::new(0),
            mounted: AtomicBool::new(true),
        }
    }

    pub(crate) async fn snapshot(&self) -> Vec<V> {
        self.inner.read().await.items.clone()
    }

    pub(crate) async fn phase(&self) -> LoadPhase {
        self.inner.read().await.phase
    }

    pub(crate) fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    pub(crate) fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }

    fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Runs one fetch and swaps in its result unless a newer write landed
    /// meanwhile. On failure the previous records are kept. The phase
    /// returns to `Ready` once the newest refresh is done.
    pub(crate) async fn run_refresh<F>(&self, feed: &'static str, fetch: F) -> Vec<V>
    where
        F: Future<Output = Result<Vec<V>>>,
    {
        if !self.is_mounted() {
            debug!(feed, "refresh skipped on unmounted feed");
            return Vec::new();
        }
        let version = self.next_version();
        {
            let mut inner = self.inner.write().await;
            inner.phase = LoadPhase::Loading;
            inner.newest_refresh = inner.newest_refresh.max(version);
        }

        let outcome = fetch.await;

        if !self.is_mounted() {
            debug!(feed, "discarding refresh result after unmount");
            return Vec::new();
        }
        let mut inner = self.inner.write().await;
        match outcome {
            Ok(items) if version > inner.version => {
                debug!(feed, count = items.len(), version, "feed refreshed");
                inner.items = items;
                inner.version = version;
            }
            Ok(_) => debug!(
                feed,
                version,
                current = inner.version,
                "dropping superseded refresh result"
            ),
            Err(e) => error!(feed, error = %e, "refresh failed; keeping previous records"),
        }
        if version == inner.newest_refresh {
            inner.phase = LoadPhase::Ready;
        }
        inner.items.clone()
    }

    pub(crate) async fn prepend(&self, item: V) {
        self.insert_with(item, |_| 0).await;
    }

    /// Inserts at the index chosen by `position` over the current records.
    pub(crate) async fn insert_with<P>(&self, item: V, position: P)
    where
        P: FnOnce(&[V]) -> usize,
    {
        if !self.is_mounted() {
            return;
        }
        let mut inner = self.inner.write().await;
        let at = position(&inner.items).min(inner.items.len());
        inner.items.insert(at, item);
        inner.version = self.next_version();
    }
}

/// Rejects empty or whitespace-only text before any backend round-trip.
pub(crate) fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    Ok(value)
}
