//! Profile lookups and explicit, idempotent profile creation.

use std::collections::HashMap;
use std::sync::Arc;

use ab_core::{Actor, AppError, BackendClient, Profile, Result, RowQuery, Table};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Serialize)]
struct NewProfileRow<'a> {
    id: Uuid,
    username: &'a str,
}

pub struct ProfileDirectory {
    client: Arc<BackendClient>,
}

impl ProfileDirectory {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Profile>> {
        lookup(&self.client, id).await
    }

    /// Profile of the signed-in actor, if any.
    pub async fn current_profile(&self) -> Result<Option<Profile>> {
        match self.client.current_actor().await? {
            Some(actor) => self.get(actor.id).await,
            None => Ok(None),
        }
    }

    /// Returns the actor's profile, creating it on first use.
    ///
    /// Safe to call before every dependent mutation. When two calls race, the
    /// loser's insert conflicts and the row written by the winner is returned.
    pub async fn ensure_profile(&self, actor: &Actor) -> Result<Profile> {
        if let Some(existing) = self.get(actor.id).await? {
            return Ok(existing);
        }

        let username = default_username(actor);
        let row = NewProfileRow {
            id: actor.id,
            username: &username,
        };
        match self.client.insert::<_, Profile>(Table::Profiles, &row).await {
            Ok(profile) => {
                info!(actor_id = %actor.id, %username, "profile created");
                Ok(profile)
            }
            Err(AppError::Conflict(_)) => self
                .get(actor.id)
                .await?
                .ok_or_else(|| AppError::NotFound("Profile".into(), actor.id.to_string())),
            Err(e) => {
                warn!(actor_id = %actor.id, error = %e, "profile creation failed");
                Err(e)
            }
        }
    }
}

/// E-mail local part, or `user_` plus five random characters.
fn default_username(actor: &Actor) -> String {
    actor
        .email
        .as_deref()
        .and_then(|email| email.split('@').next())
        .filter(|local| !local.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let random = Uuid::new_v4().simple().to_string();
            format!("user_{}", &random[..5])
        })
}

pub(crate) async fn lookup(client: &BackendClient, id: Uuid) -> Result<Option<Profile>> {
    let mut found: Vec<Profile> = client
        .query(Table::Profiles, &RowQuery::new().eq("id", id))
        .await?;
    Ok(found.pop())
}

/// Loads every profile in `ids` with a single query.
pub(crate) async fn by_ids<I>(client: &BackendClient, ids: I) -> Result<HashMap<Uuid, Profile>>
where
    I: IntoIterator<Item = Uuid>,
{
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let profiles: Vec<Profile> = client
        .query(Table::Profiles, &RowQuery::new().in_list("id", ids))
        .await?;
    Ok(profiles.into_iter().map(|p| (p.id, p)).collect())
}

/// Author lookup for freshly created records. A failure only costs the
/// author field, so it is logged rather than returned.
pub(crate) async fn author_of(client: &BackendClient, id: Uuid) -> Option<Profile> {
    match lookup(client, id).await {
        Ok(profile) => profile,
        Err(e) => {
            warn!(user_id = %id, error = %e, "author lookup failed");
            None
        }
    }
}
