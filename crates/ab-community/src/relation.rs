//! Relation tables (likes, comments, memberships, attendance) and the
//! derived fields computed from them.

use std::collections::{HashMap, HashSet};

use ab_core::{AppError, BackendClient, Result, Row, RowQuery, Table};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

/// A join table keyed by `entity_column` + `user_id`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Relation {
    pub table: Table,
    pub entity_column: &'static str,
    /// Count distinct users rather than rows. Comments count every row.
    pub distinct_users: bool,
}

pub(crate) const LIKES: Relation = Relation {
    table: Table::Likes,
    entity_column: "post_id",
    distinct_users: true,
};

pub(crate) const COMMENTS: Relation = Relation {
    table: Table::Comments,
    entity_column: "post_id",
    distinct_users: false,
};

pub(crate) const MEMBERS: Relation = Relation {
    table: Table::GroupMembers,
    entity_column: "group_id",
    distinct_users: true,
};

pub(crate) const ATTENDEES: Relation = Relation {
    table: Table::EventAttendees,
    entity_column: "event_id",
    distinct_users: true,
};

/// Derived count and participation flag for one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelationStats {
    pub count: u64,
    pub includes_actor: bool,
}

/// Result of a like/join/attend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A new join-row was written.
    Inserted,
    /// The actor already participated; nothing was written.
    AlreadyPresent,
}

pub(crate) fn uuid_field(row: &Row, column: &str) -> Result<Uuid> {
    row.get(column)
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .ok_or_else(|| AppError::Internal(format!("row has no valid `{column}`")))
}

/// Computes stats for every id in `ids` with one query on the relation table.
/// Ids without rows are absent from the map (callers default them to zero).
/// Rows missing either id column are skipped.
pub(crate) async fn relation_stats(
    client: &BackendClient,
    relation: Relation,
    ids: &[Uuid],
    actor: Option<Uuid>,
) -> Result<HashMap<Uuid, RelationStats>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let query = RowQuery::new().in_list(relation.entity_column, ids.iter().copied());
    let rows = client.query_rows(relation.table, &query).await?;

    let mut users: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
    let mut raw_counts: HashMap<Uuid, u64> = HashMap::new();
    for row in &rows {
        let ids = (uuid_field(row, relation.entity_column), uuid_field(row, "user_id"));
        let (entity, user) = match ids {
            (Ok(entity), Ok(user)) => (entity, user),
            (Err(e), _) | (_, Err(e)) => {
                warn!(table = %relation.table, error = %e, "skipping malformed relation row");
                continue;
            }
        };
        users.entry(entity).or_default().insert(user);
        *raw_counts.entry(entity).or_default() += 1;
    }

    let stats = users
        .into_iter()
        .map(|(entity, members)| {
            let count = if relation.distinct_users {
                members.len() as u64
            } else {
                raw_counts.get(&entity).copied().unwrap_or_default()
            };
            let includes_actor = actor.is_some_and(|a| members.contains(&a));
            (entity, RelationStats { count, includes_actor })
        })
        .collect();
    Ok(stats)
}

async fn has_relation(
    client: &BackendClient,
    relation: Relation,
    entity_id: Uuid,
    user_id: Uuid,
) -> Result<bool> {
    let query = RowQuery::new()
        .eq(relation.entity_column, entity_id)
        .eq("user_id", user_id);
    Ok(!client.query_rows(relation.table, &query).await?.is_empty())
}

/// Records the actor's participation in `entity_id`.
///
/// With `guard` set, an existing row short-circuits to `AlreadyPresent`.
/// The check and the insert are separate calls, so two toggles racing before
/// either completes can still write two rows; the derived count stays correct
/// because it counts distinct users. Without `guard` every call inserts.
pub(crate) async fn toggle(
    client: &BackendClient,
    relation: Relation,
    entity_id: Uuid,
    guard: bool,
) -> Result<ToggleOutcome> {
    let actor = client.require_actor().await?;

    if guard && has_relation(client, relation, entity_id, actor.id).await? {
        debug!(table = %relation.table, %entity_id, actor_id = %actor.id, "relation already present");
        return Ok(ToggleOutcome::AlreadyPresent);
    }

    let mut row = Row::new();
    row.insert(
        relation.entity_column.to_string(),
        Value::String(entity_id.to_string()),
    );
    row.insert("user_id".to_string(), Value::String(actor.id.to_string()));

    match client.insert::<_, Row>(relation.table, &row).await {
        Ok(_) => Ok(ToggleOutcome::Inserted),
        // The backend enforces uniqueness on this pair.
        Err(AppError::Conflict(_)) => Ok(ToggleOutcome::AlreadyPresent),
        Err(e) => {
            warn!(table = %relation.table, %entity_id, error = %e, "relation insert failed");
            Err(e)
        }
    }
}
