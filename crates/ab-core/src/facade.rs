//! # Backend Client Facade
//!
//! One explicitly constructed handle over the three ports. Access modules
//! receive it by `Arc` at construction; there is no process-wide singleton.
//! Every call is a single attempt: failures propagate immediately.

use std::sync::Arc;

use bytes::Bytes;
use mime::Mime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::Actor;
use crate::query::{Row, RowQuery};
use crate::schema::{Bucket, Table};
use crate::traits::{AuthSession, BlobStore, RowStore};

/// A file selected for upload.
#[derive(Debug, Clone)]
pub struct BlobUpload {
    /// Original file name; only its extension is kept in the stored path
    pub file_name: String,
    pub data: Bytes,
    /// Guessed from `file_name` when absent
    pub content_type: Option<Mime>,
}

impl BlobUpload {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
            content_type: None,
        }
    }
}

#[derive(Clone)]
pub struct BackendClient {
    auth: Arc<dyn AuthSession>,
    rows: Arc<dyn RowStore>,
    blobs: Arc<dyn BlobStore>,
}

impl BackendClient {
    pub fn new(
        auth: Arc<dyn AuthSession>,
        rows: Arc<dyn RowStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self { auth, rows, blobs }
    }

    /// Builds the facade from a plugin implementing all three ports.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: AuthSession + RowStore + BlobStore + 'static,
    {
        Self {
            auth: backend.clone(),
            rows: backend.clone(),
            blobs: backend,
        }
    }

    pub async fn current_actor(&self) -> Result<Option<Actor>> {
        self.auth.current_actor().await
    }

    /// Resolves the signed-in actor or fails with `Unauthenticated`.
    pub async fn require_actor(&self) -> Result<Actor> {
        self.current_actor().await?.ok_or(AppError::Unauthenticated)
    }

    pub async fn query_rows(&self, table: Table, query: &RowQuery) -> Result<Vec<Row>> {
        debug!(%table, filters = query.filters.len(), "selecting rows");
        self.rows.select(table, query).await
    }

    pub async fn query<T: DeserializeOwned>(&self, table: Table, query: &RowQuery) -> Result<Vec<T>> {
        self.query_rows(table, query)
            .await?
            .into_iter()
            .map(from_row)
            .collect()
    }

    /// Inserts `fields` as one row. Mutations require a signed-in actor.
    pub async fn insert<T, R>(&self, table: Table, fields: &T) -> Result<R>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.require_actor().await?;
        let row = to_row(fields)?;
        debug!(%table, "inserting row");
        let stored = self.rows.insert(table, row).await?;
        from_row(stored)
    }

    /// Stores a file under `<bucket>/<random>.<ext>` and returns its public URL.
    pub async fn upload_blob(&self, bucket: Bucket, upload: BlobUpload) -> Result<String> {
        self.require_actor().await?;
        let path = object_path(bucket, &upload.file_name);
        let content_type = upload
            .content_type
            .unwrap_or_else(|| mime_guess::from_path(&upload.file_name).first_or_octet_stream());

        debug!(%bucket, %path, size = upload.data.len(), "uploading blob");
        self.blobs
            .save_upload(bucket, &path, upload.data, &content_type)
            .await?;
        Ok(self.blobs.public_url(bucket, &path))
    }
}

fn object_path(bucket: Bucket, file_name: &str) -> String {
    let stem = Uuid::new_v4().simple().to_string();
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => {
            format!("{}/{}.{}", bucket, stem, ext.to_ascii_lowercase())
        }
        _ => format!("{}/{}", bucket, stem),
    }
}

pub fn to_row<T: Serialize + ?Sized>(fields: &T) -> Result<Row> {
    match serde_json::to_value(fields)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Internal(format!(
            "expected a JSON object for a row, got {other}"
        ))),
    }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockAuthSession, MockBlobStore, MockRowStore};
    use serde_json::json;

    fn client(auth: MockAuthSession, rows: MockRowStore, blobs: MockBlobStore) -> BackendClient {
        BackendClient::new(Arc::new(auth), Arc::new(rows), Arc::new(blobs))
    }

    fn signed_in() -> MockAuthSession {
        let mut auth = MockAuthSession::new();
        auth.expect_current_actor()
            .returning(|| Ok(Some(Actor::new(Uuid::new_v4(), None))));
        auth
    }

    #[tokio::test]
    async fn insert_without_actor_never_reaches_the_store() {
        let mut auth = MockAuthSession::new();
        auth.expect_current_actor().returning(|| Ok(None));
        let mut rows = MockRowStore::new();
        rows.expect_insert().never();

        let backend = client(auth, rows, MockBlobStore::new());
        let err = backend
            .insert::<_, Row>(Table::Posts, &json!({ "content": "hi" }))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::Unauthenticated);
    }

    #[tokio::test]
    async fn upload_keeps_extension_and_guesses_mime() {
        let mut blobs = MockBlobStore::new();
        blobs
            .expect_save_upload()
            .withf(|bucket, path, _, mime| {
                *bucket == Bucket::Posts
                    && path.starts_with("posts/")
                    && path.ends_with(".png")
                    && mime.essence_str() == "image/png"
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));
        blobs
            .expect_public_url()
            .returning(|bucket, path| format!("https://cdn.test/{bucket}/{path}"));

        let backend = client(signed_in(), MockRowStore::new(), blobs);
        let url = backend
            .upload_blob(Bucket::Posts, BlobUpload::new("Beach.PNG", vec![1u8, 2, 3]))
            .await
            .unwrap();
        assert!(url.starts_with("https://cdn.test/posts/posts/"));
        assert!(url.ends_with(".png"));
    }

    #[test]
    fn non_object_payload_is_rejected() {
        assert!(matches!(to_row(&json!([1, 2])), Err(AppError::Internal(_))));
    }
}
