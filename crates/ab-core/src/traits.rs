//! # Core Traits (Ports)
//!
//! Any backend plugin must implement these traits to be used by the binary.
//! The hosted service is a black box: auth session, row storage, object storage.

use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;

use crate::error::Result;
use crate::models::Actor;
use crate::query::{Row, RowQuery};
use crate::schema::{Bucket, Table};

/// Identity contract. Read-only from the access layer's perspective.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuthSession: Send + Sync {
    /// The signed-in actor, or `None` when nobody is signed in.
    async fn current_actor(&self) -> Result<Option<Actor>>;
}

/// Relational row storage contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn select(&self, table: Table, query: &RowQuery) -> Result<Vec<Row>>;

    /// Inserts one row and returns it as stored, including backend-assigned
    /// columns (`id`, `created_at`).
    async fn insert(&self, table: Table, row: Row) -> Result<Row>;
}

/// Media storage contract for user uploads.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn save_upload(
        &self,
        bucket: Bucket,
        path: &str,
        data: Bytes,
        content_type: &Mime,
    ) -> Result<()>;

    /// Publicly resolvable URL of a stored object.
    fn public_url(&self, bucket: Bucket, path: &str) -> String;
}
