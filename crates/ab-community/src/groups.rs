//! Group feed: groups newest-first with member counts and whether the
//! current actor is a member.

use std::sync::Arc;

use ab_core::{BackendClient, BlobUpload, Bucket, Group, GroupView, Result, RowQuery, Table};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::feed::{require_text, FeedState, LoadPhase};
use crate::relation::{self, ToggleOutcome, MEMBERS};
use crate::CommunityOptions;

/// Caller-supplied fields for a new group.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
}

#[derive(Serialize)]
struct NewGroupRow<'a> {
    #[serde(flatten)]
    group: &'a NewGroup,
    created_by: Uuid,
}

pub struct GroupFeed {
    client: Arc<BackendClient>,
    options: CommunityOptions,
    state: FeedState<GroupView>,
}

impl GroupFeed {
    pub fn new(client: Arc<BackendClient>, options: CommunityOptions) -> Self {
        Self {
            client,
            options,
            state: FeedState::new(),
        }
    }

    pub async fn fetch(&self) -> Result<Vec<GroupView>> {
        let actor = self.client.current_actor().await?.map(|a| a.id);
        let mut groups: Vec<Group> = self
            .client
            .query(Table::Groups, &RowQuery::new().order_by("created_at", false))
            .await?;
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let ids: Vec<Uuid> = groups.iter().map(|g| g.id).collect();
        let members = relation::relation_stats(&self.client, MEMBERS, &ids, actor).await?;
        Ok(groups
            .into_iter()
            .map(|group| {
                let stats = members.get(&group.id).copied().unwrap_or_default();
                GroupView {
                    group,
                    member_count: stats.count,
                    is_member: stats.includes_actor,
                }
            })
            .collect())
    }

    pub async fn refresh(&self) -> Vec<GroupView> {
        self.state.run_refresh("groups", self.fetch()).await
    }

    pub async fn groups(&self) -> Vec<GroupView> {
        self.state.snapshot().await
    }

    /// Groups the current actor belongs to, as of the last refresh.
    pub async fn my_groups(&self) -> Vec<GroupView> {
        self.groups()
            .await
            .into_iter()
            .filter(|g| g.is_member)
            .collect()
    }

    pub async fn phase(&self) -> LoadPhase {
        self.state.phase().await
    }

    pub fn unmount(&self) {
        self.state.unmount();
    }

    pub async fn create_group(&self, new_group: NewGroup) -> Result<GroupView> {
        require_text("name", &new_group.name)?;
        let actor = self.client.require_actor().await?;

        let row = NewGroupRow {
            group: &new_group,
            created_by: actor.id,
        };
        let group: Group = self
            .client
            .insert(Table::Groups, &row)
            .await
            .inspect_err(|e| warn!(actor_id = %actor.id, error = %e, "group creation failed"))?;

        // Creating a group does not make the creator a member.
        let view = GroupView {
            group,
            member_count: 0,
            is_member: false,
        };
        self.state.prepend(view.clone()).await;
        info!(group_id = %view.group.id, name = %view.group.name, "group created");
        Ok(view)
    }

    /// Uploads the cover image to the groups bucket, then creates the group.
    pub async fn create_group_with_cover(
        &self,
        mut new_group: NewGroup,
        cover: Option<BlobUpload>,
    ) -> Result<GroupView> {
        require_text("name", &new_group.name)?;
        if let Some(upload) = cover {
            new_group.cover_image_url = Some(self.client.upload_blob(Bucket::Groups, upload).await?);
        }
        self.create_group(new_group).await
    }

    pub async fn join_group(&self, group_id: Uuid) -> Result<ToggleOutcome> {
        let outcome =
            relation::toggle(&self.client, MEMBERS, group_id, self.options.duplicate_guard).await?;
        self.refresh().await;
        Ok(outcome)
    }
}
