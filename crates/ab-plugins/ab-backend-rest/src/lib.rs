//! # ab-backend-rest
//!
//! Hosted backend plugin speaking the service's REST surface:
//! rows under `/rest/v1`, objects under `/storage/v1/object`, password
//! sign-in under `/auth/v1`. Each port call is exactly one HTTP request.

mod error;
mod params;

use ab_core::{
    Actor, AppError, AuthSession, BlobStore, Bucket, Result, Row, RowQuery, RowStore, Table,
};
use async_trait::async_trait;
use bytes::Bytes;
use mime::Mime;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

struct Session {
    access_token: SecretString,
    actor: Actor,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

pub struct RestBackend {
    http: Client,
    /// Base URL without a trailing slash
    base: String,
    anon_key: SecretString,
    session: RwLock<Option<Session>>,
}

impl RestBackend {
    pub fn new(base_url: &Url, anon_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("abroad/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base: base_url.as_str().trim_end_matches('/').to_string(),
            anon_key,
            session: RwLock::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    /// Adds the API key and the bearer token: the session token when signed
    /// in, the anon key otherwise.
    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let session = self.session.read().await;
        let bearer = match session.as_ref() {
            Some(s) => s.access_token.expose_secret().to_string(),
            None => self.anon_key.expose_secret().to_string(),
        };
        request
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(bearer)
    }

    async fn send(&self, what: &str, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| error::transport(what, e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(%status, what, "backend request rejected");
        Err(error::from_status(status, what, body))
    }

    /// Exchanges e-mail and password for a session. Later requests carry the
    /// session token.
    pub async fn sign_in_with_password(&self, email: &str, password: &SecretString) -> Result<Actor> {
        let request = self
            .http
            .post(self.url("auth/v1/token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password.expose_secret() }));
        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| error::transport("sign-in", e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "sign-in rejected");
            return Err(error::from_sign_in_status(status, body));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| error::decode("sign-in", e))?;

        let actor = Actor::new(token.user.id, token.user.email);
        *self.session.write().await = Some(Session {
            access_token: SecretString::from(token.access_token),
            actor: actor.clone(),
        });
        info!(actor_id = %actor.id, "signed in");
        Ok(actor)
    }

    /// Drops the local session and revokes it on the server.
    pub async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        let request = self
            .http
            .post(self.url("auth/v1/logout"))
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(session.access_token.expose_secret());
        let response = request
            .send()
            .await
            .map_err(|e| error::transport("sign-out", e))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(error::from_status(status, "sign-out", body));
        }
        info!(actor_id = %session.actor.id, "signed out");
        Ok(())
    }
}

#[async_trait]
impl AuthSession for RestBackend {
    async fn current_actor(&self) -> Result<Option<Actor>> {
        Ok(self.session.read().await.as_ref().map(|s| s.actor.clone()))
    }
}

#[async_trait]
impl RowStore for RestBackend {
    async fn select(&self, table: Table, query: &RowQuery) -> Result<Vec<Row>> {
        let request = self
            .http
            .get(self.url(&format!("rest/v1/{table}")))
            .query(&params::render(query));
        let rows: Vec<Row> = self
            .send(table.as_str(), request)
            .await?
            .json()
            .await
            .map_err(|e| error::decode(table.as_str(), e))?;
        debug!(%table, count = rows.len(), "rows selected");
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Row> {
        let request = self
            .http
            .post(self.url(&format!("rest/v1/{table}")))
            .header("Prefer", "return=representation")
            .json(&Value::Object(row));
        let mut stored: Vec<Row> = self
            .send(table.as_str(), request)
            .await?
            .json()
            .await
            .map_err(|e| error::decode(table.as_str(), e))?;
        if stored.is_empty() {
            return Err(AppError::Internal(format!("insert into {table} returned no row")));
        }
        Ok(stored.swap_remove(0))
    }
}

#[async_trait]
impl BlobStore for RestBackend {
    async fn save_upload(
        &self,
        bucket: Bucket,
        path: &str,
        data: Bytes,
        content_type: &Mime,
    ) -> Result<()> {
        let size = data.len();
        let request = self
            .http
            .post(self.url(&format!("storage/v1/object/{bucket}/{path}")))
            .header(reqwest::header::CONTENT_TYPE, content_type.as_ref())
            .body(data);
        self.send("storage", request).await?;
        debug!(%bucket, path, size, "object stored");
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        self.url(&format!("storage/v1/object/public/{bucket}/{path}"))
    }
}
