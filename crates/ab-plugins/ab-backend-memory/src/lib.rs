//! # ab-backend-memory
//!
//! In-process implementation of the three backend ports. Tables are vectors
//! of JSON rows keyed by `Table`; every `RowQuery` filter and order is
//! honoured. Used by the scenario tests and the offline build of the CLI.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

use ab_core::{
    Actor, AppError, AuthSession, BlobStore, Bucket, Clock, Filter, FilterOp, Result, Row,
    RowQuery, RowStore, SystemClock, Table,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use mime::Mime;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

const DEFAULT_PUBLIC_BASE: &str = "memory://storage";

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub data: Bytes,
    pub content_type: Mime,
}

pub struct MemoryBackend {
    tables: DashMap<Table, Vec<Row>>,
    blobs: DashMap<String, StoredBlob>,
    /// Column sets that must be unique per table, besides `id`
    unique: HashMap<Table, Vec<&'static str>>,
    actor: RwLock<Option<Actor>>,
    clock: Arc<dyn Clock>,
    public_base: String,
    rows_offline: AtomicBool,
    blobs_offline: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Stamps `created_at` on new rows with `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: DashMap::new(),
            blobs: DashMap::new(),
            unique: HashMap::new(),
            actor: RwLock::new(None),
            clock,
            public_base: DEFAULT_PUBLIC_BASE.to_string(),
            rows_offline: AtomicBool::new(false),
            blobs_offline: AtomicBool::new(false),
        }
    }

    /// Rejects a second row in `table` agreeing on all of `columns`.
    pub fn with_unique(mut self, table: Table, columns: &[&'static str]) -> Self {
        self.unique.insert(table, columns.to_vec());
        self
    }

    /// The one-row-per-(entity, user) constraints of likes, memberships and
    /// attendance.
    pub fn with_relation_constraints(self) -> Self {
        self.with_unique(Table::Likes, &["post_id", "user_id"])
            .with_unique(Table::GroupMembers, &["group_id", "user_id"])
            .with_unique(Table::EventAttendees, &["event_id", "user_id"])
    }

    pub fn with_public_base(mut self, base: impl Into<String>) -> Self {
        self.public_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn sign_in(&self, actor: Actor) {
        self.set_actor(Some(actor));
    }

    pub fn sign_out(&self) {
        self.set_actor(None);
    }

    fn set_actor(&self, actor: Option<Actor>) {
        match self.actor.write() {
            Ok(mut guard) => *guard = actor,
            Err(poisoned) => *poisoned.into_inner() = actor,
        }
    }

    /// Makes every row select and insert fail with `BackendUnavailable`.
    pub fn set_rows_offline(&self, offline: bool) {
        self.rows_offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Makes every upload fail with `BackendUnavailable`.
    pub fn set_blobs_offline(&self, offline: bool) {
        self.blobs_offline.store(offline, AtomicOrdering::SeqCst);
    }

    /// Writes a row as-is, bypassing auth, defaults and constraints.
    pub fn seed(&self, table: Table, row: Row) {
        self.tables.entry(table).or_default().push(row);
    }

    /// Copy of every row in `table`, in insertion order.
    pub fn rows(&self, table: Table) -> Vec<Row> {
        self.tables
            .get(&table)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: Table) -> usize {
        self.tables.get(&table).map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn blob(&self, path: &str) -> Option<StoredBlob> {
        self.blobs.get(path).map(|b| b.clone())
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }

    fn check_rows_online(&self) -> Result<()> {
        if self.rows_offline.load(AtomicOrdering::SeqCst) {
            return Err(AppError::unavailable("row storage offline"));
        }
        Ok(())
    }

    fn violates(&self, table: Table, existing: &[Row], row: &Row) -> Option<String> {
        let same = |a: &Row, col: &str| match (a.get(col), row.get(col)) {
            (Some(x), Some(y)) => !x.is_null() && compare(x, y) == Some(Ordering::Equal),
            _ => false,
        };
        if existing.iter().any(|r| same(r, "id")) {
            return Some(format!("duplicate id in {table}"));
        }
        let columns = self.unique.get(&table)?;
        existing
            .iter()
            .any(|r| columns.iter().all(|c| same(r, c)))
            .then(|| format!("duplicate ({}) in {table}", columns.join(", ")))
    }
}

/// Orders two JSON scalars: timestamps chronologically, then numbers, then
/// strings and booleans. Mismatched or null operands are incomparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => {
            match (x.parse::<DateTime<Utc>>(), y.parse::<DateTime<Utc>>()) {
                (Ok(dx), Ok(dy)) => Some(dx.cmp(&dy)),
                _ => Some(x.cmp(y)),
            }
        }
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn matches(row: &Row, filter: &Filter) -> bool {
    let Some(cell) = row.get(&filter.column) else {
        return false;
    };
    let ord = |v: &Value| compare(cell, v);
    match filter.op {
        FilterOp::Eq => ord(&filter.value) == Some(Ordering::Equal),
        FilterOp::Gte => matches!(ord(&filter.value), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::Lt => ord(&filter.value) == Some(Ordering::Less),
        FilterOp::In => filter
            .value
            .as_array()
            .is_some_and(|cands| cands.iter().any(|v| ord(v) == Some(Ordering::Equal))),
    }
}

#[async_trait]
impl AuthSession for MemoryBackend {
    async fn current_actor(&self) -> Result<Option<Actor>> {
        let actor = match self.actor.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Ok(actor)
    }
}

#[async_trait]
impl RowStore for MemoryBackend {
    async fn select(&self, table: Table, query: &RowQuery) -> Result<Vec<Row>> {
        self.check_rows_online()?;
        let mut rows: Vec<Row> = self
            .tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|r| query.filters.iter().all(|f| matches(r, f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            // Rows missing the column sort last in either direction.
            rows.sort_by(|a, b| {
                match (a.get(&order.column), b.get(&order.column)) {
                    (Some(x), Some(y)) => {
                        let o = compare(x, y).unwrap_or(Ordering::Equal);
                        if order.ascending { o } else { o.reverse() }
                    }
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            });
        }
        debug!(%table, count = rows.len(), "memory select");
        Ok(rows)
    }

    async fn insert(&self, table: Table, mut row: Row) -> Result<Row> {
        self.check_rows_online()?;
        if !row.contains_key("id") {
            row.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        }
        if !row.contains_key("created_at") {
            row.insert("created_at".into(), serde_json::to_value(self.clock.now())?);
        }

        // Holding the table entry makes check-and-push atomic.
        let mut rows = self.tables.entry(table).or_default();
        if let Some(reason) = self.violates(table, &rows, &row) {
            return Err(AppError::Conflict(reason));
        }
        rows.push(row.clone());
        debug!(%table, count = rows.len(), "memory insert");
        Ok(row)
    }
}

#[async_trait]
impl BlobStore for MemoryBackend {
    async fn save_upload(
        &self,
        bucket: Bucket,
        path: &str,
        data: Bytes,
        content_type: &Mime,
    ) -> Result<()> {
        if self.blobs_offline.load(AtomicOrdering::SeqCst) {
            return Err(AppError::unavailable("object storage offline"));
        }
        debug!(%bucket, path, size = data.len(), "memory upload");
        self.blobs.insert(
            format!("{bucket}/{path}"),
            StoredBlob {
                data,
                content_type: content_type.clone(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!("{}/{bucket}/{path}", self.public_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_core::FixedClock;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("test rows are objects"),
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        let backend = MemoryBackend::with_clock(Arc::new(FixedClock::new(at)));

        let stored = backend
            .insert(Table::Posts, row(json!({ "content": "hi" })))
            .await
            .unwrap();
        assert!(stored["id"].as_str().and_then(|s| s.parse::<Uuid>().ok()).is_some());
        let created: DateTime<Utc> = serde_json::from_value(stored["created_at"].clone()).unwrap();
        assert_eq!(created, at);
        assert_eq!(backend.row_count(Table::Posts), 1);
    }

    #[tokio::test]
    async fn filters_compare_timestamps_chronologically() {
        let backend = MemoryBackend::new();
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        for (title, offset) in [("past", -1), ("now", 0), ("later", 2)] {
            let start = base + Duration::hours(offset);
            backend.seed(Table::Events, row(json!({ "title": title, "start_time": start })));
        }

        let query = RowQuery::new().gte("start_time", base).order_by("start_time", false);
        let rows = backend.select(Table::Events, &query).await.unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r["title"].as_str().unwrap()).collect();
        assert_eq!(titles, ["later", "now"]);

        let before = RowQuery::new().lt("start_time", base);
        assert_eq!(backend.select(Table::Events, &before).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn in_filter_and_missing_columns() {
        let backend = MemoryBackend::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        for post in [a, b, c] {
            backend.seed(Table::Likes, row(json!({ "post_id": post, "user_id": a })));
        }
        backend.seed(Table::Likes, row(json!({ "user_id": a })));

        let query = RowQuery::new().in_list("post_id", [a, c]);
        assert_eq!(backend.select(Table::Likes, &query).await.unwrap().len(), 2);
        let none = RowQuery::new().in_list("post_id", Vec::<Uuid>::new());
        assert!(backend.select(Table::Likes, &none).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn relation_constraints_reject_duplicates() {
        let backend = MemoryBackend::new().with_relation_constraints();
        let (event, user) = (Uuid::new_v4(), Uuid::new_v4());
        let attend = || row(json!({ "event_id": event, "user_id": user }));

        backend.insert(Table::EventAttendees, attend()).await.unwrap();
        let err = backend.insert(Table::EventAttendees, attend()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(backend.row_count(Table::EventAttendees), 1);

        // Without the constraint the same pair is accepted twice.
        let loose = MemoryBackend::new();
        loose.insert(Table::EventAttendees, attend()).await.unwrap();
        loose.insert(Table::EventAttendees, attend()).await.unwrap();
        assert_eq!(loose.row_count(Table::EventAttendees), 2);
    }

    #[tokio::test]
    async fn duplicate_primary_key_conflicts() {
        let backend = MemoryBackend::new();
        let id = Uuid::new_v4();
        backend
            .insert(Table::Profiles, row(json!({ "id": id, "username": "kenji" })))
            .await
            .unwrap();
        let err = backend
            .insert(Table::Profiles, row(json!({ "id": id, "username": "other" })))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn offline_switches_fail_with_backend_unavailable() {
        let backend = MemoryBackend::new();
        backend.set_rows_offline(true);
        let err = backend.select(Table::Posts, &RowQuery::new()).await.unwrap_err();
        assert!(matches!(err, AppError::BackendUnavailable(_)));

        backend.set_blobs_offline(true);
        let err = backend
            .save_upload(Bucket::Posts, "posts/a.png", Bytes::from_static(b"x"), &mime::IMAGE_PNG)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BackendUnavailable(_)));
        assert_eq!(backend.blob_count(), 0);
    }

    #[tokio::test]
    async fn uploads_resolve_to_public_urls() {
        let backend = MemoryBackend::new().with_public_base("https://cdn.test/");
        backend
            .save_upload(Bucket::Stories, "stories/x.jpg", Bytes::from_static(b"jpg"), &mime::IMAGE_JPEG)
            .await
            .unwrap();
        assert_eq!(
            backend.public_url(Bucket::Stories, "stories/x.jpg"),
            "https://cdn.test/stories/stories/x.jpg"
        );
        let blob = backend.blob("stories/stories/x.jpg").unwrap();
        assert_eq!(blob.content_type, mime::IMAGE_JPEG);
    }
}
