//! Story feed: unexpired stories newest-first with their author.

use std::sync::Arc;

use ab_core::{BackendClient, BlobUpload, Bucket, Clock, Result, RowQuery, Story, StoryView, Table};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::feed::{require_text, FeedState, LoadPhase};
use crate::profiles;
use crate::CommunityOptions;

#[derive(Serialize)]
struct NewStoryRow<'a> {
    user_id: Uuid,
    media_url: &'a str,
    expires_at: DateTime<Utc>,
}

pub struct StoryFeed {
    client: Arc<BackendClient>,
    clock: Arc<dyn Clock>,
    options: CommunityOptions,
    state: FeedState<StoryView>,
}

impl StoryFeed {
    pub fn new(client: Arc<BackendClient>, clock: Arc<dyn Clock>, options: CommunityOptions) -> Self {
        Self {
            client,
            clock,
            options,
            state: FeedState::new(),
        }
    }

    /// Stories with `expires_at >= now`, newest first. The window is applied
    /// again locally so a lenient backend cannot leak expired stories.
    pub async fn fetch(&self) -> Result<Vec<StoryView>> {
        let now = self.clock.now();
        let query = RowQuery::new()
            .gte("expires_at", now)
            .order_by("created_at", false);
        let mut stories: Vec<Story> = self.client.query(Table::Stories, &query).await?;
        stories.retain(|s| s.expires_at >= now);
        stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let authors = profiles::by_ids(&self.client, stories.iter().map(|s| s.user_id)).await?;
        Ok(stories
            .into_iter()
            .map(|story| StoryView {
                author: authors.get(&story.user_id).cloned(),
                story,
            })
            .collect())
    }

    pub async fn refresh(&self) -> Vec<StoryView> {
        self.state.run_refresh("stories", self.fetch()).await
    }

    pub async fn stories(&self) -> Vec<StoryView> {
        self.state.snapshot().await
    }

    pub async fn phase(&self) -> LoadPhase {
        self.state.phase().await
    }

    pub fn unmount(&self) {
        self.state.unmount();
    }

    /// Publishes a story that expires after the configured TTL.
    pub async fn create_story(&self, media_url: &str) -> Result<StoryView> {
        let media_url = require_text("media_url", media_url)?;
        let actor = self.client.require_actor().await?;

        let row = NewStoryRow {
            user_id: actor.id,
            media_url,
            expires_at: self.clock.now() + self.options.story_ttl,
        };
        let story: Story = self
            .client
            .insert(Table::Stories, &row)
            .await
            .inspect_err(|e| warn!(actor_id = %actor.id, error = %e, "story creation failed"))?;

        let view = StoryView {
            author: profiles::author_of(&self.client, actor.id).await,
            story,
        };
        self.state.prepend(view.clone()).await;
        info!(story_id = %view.story.id, expires_at = %view.story.expires_at, "story created");
        Ok(view)
    }

    /// Uploads to the stories bucket, then publishes.
    pub async fn create_story_with_media(&self, media: BlobUpload) -> Result<StoryView> {
        let url = self.client.upload_blob(Bucket::Stories, media).await?;
        self.create_story(&url).await
    }
}
