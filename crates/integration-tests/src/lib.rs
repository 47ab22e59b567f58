//! Shared fixtures for the scenario tests: an in-memory backend, a pinned
//! clock and a `Community` wired over both. Row selects pass through a
//! [`RowGate`] so a test can hold one call open while others run.

use std::sync::{Arc, Mutex, PoisonError};

use ab_backend_memory::MemoryBackend;
use ab_community::{Community, CommunityOptions};
use ab_core::{Actor, BackendClient, Clock, FixedClock, Result, Row, RowQuery, RowStore, Table};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tokio::sync::Notify;
use uuid::Uuid;

/// 2025-03-01 12:00 UTC
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

/// Holds the next select on one table open after it has read its rows.
///
/// The held call answers with the rows it saw before parking, like a
/// response that was already on the wire when other writes landed.
#[derive(Default)]
pub struct RowGate {
    armed: Mutex<Option<Table>>,
    parked: Notify,
    release: Notify,
}

impl RowGate {
    /// Holds the next select on `table`. Later selects pass through.
    pub fn arm(&self, table: Table) {
        *self.armed.lock().unwrap_or_else(PoisonError::into_inner) = Some(table);
    }

    /// Resolves once the armed select has read its rows and parked.
    pub async fn parked(&self) {
        self.parked.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    fn take(&self, table: Table) -> bool {
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        if *armed == Some(table) {
            *armed = None;
            return true;
        }
        false
    }
}

struct GatedRows {
    inner: Arc<MemoryBackend>,
    gate: Arc<RowGate>,
}

#[async_trait]
impl RowStore for GatedRows {
    async fn select(&self, table: Table, query: &RowQuery) -> Result<Vec<Row>> {
        let rows = self.inner.select(table, query).await?;
        if self.gate.take(table) {
            self.gate.parked.notify_one();
            self.gate.release.notified().await;
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row> {
        self.inner.insert(table, row).await
    }
}

pub struct Harness {
    pub backend: Arc<MemoryBackend>,
    pub clock: Arc<FixedClock>,
    pub gate: Arc<RowGate>,
    pub community: Community,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(CommunityOptions::default())
    }

    pub fn with_options(options: CommunityOptions) -> Self {
        Self::build(options, |backend| backend)
    }

    /// Backend that rejects a second like/membership/attendance row for the
    /// same (entity, user) pair.
    pub fn with_relation_constraints(options: CommunityOptions) -> Self {
        Self::build(options, MemoryBackend::with_relation_constraints)
    }

    fn build(options: CommunityOptions, configure: impl FnOnce(MemoryBackend) -> MemoryBackend) -> Self {
        let clock = Arc::new(FixedClock::new(epoch()));
        let backend = Arc::new(configure(MemoryBackend::with_clock(clock.clone())));
        let gate = Arc::new(RowGate::default());
        let rows = Arc::new(GatedRows {
            inner: backend.clone(),
            gate: gate.clone(),
        });
        let client = Arc::new(BackendClient::new(backend.clone(), rows, backend.clone()));
        let community = Community::new(client, clock.clone(), options);
        Self {
            backend,
            clock,
            gate,
            community,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.clock.set(self.clock.now() + by);
    }

    pub fn sign_in(&self, email: &str) -> Actor {
        let actor = Actor::new(Uuid::new_v4(), Some(email.to_string()));
        self.backend.sign_in(actor.clone());
        actor
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn unguarded() -> CommunityOptions {
    CommunityOptions {
        duplicate_guard: false,
        ..CommunityOptions::default()
    }
}
