//! Post feed: posts newest-first with author, like and comment counts, and
//! whether the current actor liked each post.

use std::sync::Arc;

use ab_core::{
    BackendClient, BlobUpload, Bucket, Comment, Post, PostView, Result, RowQuery, Table,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::feed::{require_text, FeedState, LoadPhase};
use crate::profiles;
use crate::relation::{self, ToggleOutcome, COMMENTS, LIKES};
use crate::CommunityOptions;

#[derive(Serialize)]
struct NewPostRow<'a> {
    user_id: Uuid,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<&'a str>,
}

#[derive(Serialize)]
struct NewCommentRow<'a> {
    post_id: Uuid,
    user_id: Uuid,
    content: &'a str,
}

pub struct PostFeed {
    client: Arc<BackendClient>,
    options: CommunityOptions,
    state: FeedState<PostView>,
}

impl PostFeed {
    pub fn new(client: Arc<BackendClient>, options: CommunityOptions) -> Self {
        Self {
            client,
            options,
            state: FeedState::new(),
        }
    }

    /// Queries posts with their derived fields without touching feed state.
    pub async fn fetch(&self) -> Result<Vec<PostView>> {
        let actor = self.client.current_actor().await?.map(|a| a.id);
        let mut posts: Vec<Post> = self
            .client
            .query(Table::Posts, &RowQuery::new().order_by("created_at", false))
            .await?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let authors = profiles::by_ids(&self.client, posts.iter().map(|p| p.user_id)).await?;
        let likes = relation::relation_stats(&self.client, LIKES, &ids, actor).await?;
        let comments = relation::relation_stats(&self.client, COMMENTS, &ids, actor).await?;

        Ok(posts
            .into_iter()
            .map(|post| {
                let liked = likes.get(&post.id).copied().unwrap_or_default();
                let commented = comments.get(&post.id).copied().unwrap_or_default();
                PostView {
                    author: authors.get(&post.user_id).cloned(),
                    like_count: liked.count,
                    comment_count: commented.count,
                    liked_by_actor: liked.includes_actor,
                    post,
                }
            })
            .collect())
    }

    /// Replaces the in-memory posts with a fresh fetch and returns them.
    pub async fn refresh(&self) -> Vec<PostView> {
        self.state.run_refresh("posts", self.fetch()).await
    }

    pub async fn posts(&self) -> Vec<PostView> {
        self.state.snapshot().await
    }

    pub async fn phase(&self) -> LoadPhase {
        self.state.phase().await
    }

    /// Stops writing results into this feed (view teardown).
    pub fn unmount(&self) {
        self.state.unmount();
    }

    /// Creates a post and puts it at the top of the feed.
    pub async fn create_post(&self, content: &str, image_url: Option<String>) -> Result<PostView> {
        let content = require_text("content", content)?;
        let actor = self.client.require_actor().await?;

        let row = NewPostRow {
            user_id: actor.id,
            content,
            image_url: image_url.as_deref(),
        };
        let post: Post = self
            .client
            .insert(Table::Posts, &row)
            .await
            .inspect_err(|e| warn!(actor_id = %actor.id, error = %e, "post creation failed"))?;

        // A new post has no likes or comments yet.
        let view = PostView {
            author: profiles::author_of(&self.client, actor.id).await,
            like_count: 0,
            comment_count: 0,
            liked_by_actor: false,
            post,
        };
        self.state.prepend(view.clone()).await;
        info!(post_id = %view.post.id, actor_id = %actor.id, "post created");
        Ok(view)
    }

    /// Uploads `image` to the posts bucket, then creates the post. A failed
    /// upload aborts the whole operation.
    pub async fn create_post_with_image(
        &self,
        content: &str,
        image: Option<BlobUpload>,
    ) -> Result<PostView> {
        require_text("content", content)?;
        let image_url = match image {
            Some(upload) => Some(
                self.client
                    .upload_blob(Bucket::Posts, upload)
                    .await
                    .inspect_err(|e| warn!(error = %e, "post image upload failed"))?,
            ),
            None => None,
        };
        self.create_post(content, image_url).await
    }

    /// Likes a post and re-fetches the feed to pick up the new count.
    pub async fn like_post(&self, post_id: Uuid) -> Result<ToggleOutcome> {
        let outcome =
            relation::toggle(&self.client, LIKES, post_id, self.options.duplicate_guard).await?;
        self.refresh().await;
        Ok(outcome)
    }

    pub async fn add_comment(&self, post_id: Uuid, content: &str) -> Result<Comment> {
        let content = require_text("comment", content)?;
        let actor = self.client.require_actor().await?;

        let row = NewCommentRow {
            post_id,
            user_id: actor.id,
            content,
        };
        let comment: Comment = self
            .client
            .insert(Table::Comments, &row)
            .await
            .inspect_err(|e| warn!(%post_id, error = %e, "comment creation failed"))?;
        self.refresh().await;
        Ok(comment)
    }

    /// Comments on one post, oldest first.
    pub async fn comments(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .client
            .query(
                Table::Comments,
                &RowQuery::new()
                    .eq("post_id", post_id)
                    .order_by("created_at", true),
            )
            .await?;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_core::{AppError, MockAuthSession, MockBlobStore, MockRowStore};

    fn feed(auth: MockAuthSession, rows: MockRowStore, blobs: MockBlobStore) -> PostFeed {
        let client = BackendClient::new(Arc::new(auth), Arc::new(rows), Arc::new(blobs));
        PostFeed::new(Arc::new(client), CommunityOptions::default())
    }

    #[tokio::test]
    async fn empty_content_fails_before_any_backend_call() {
        let mut auth = MockAuthSession::new();
        auth.expect_current_actor().never();
        let mut rows = MockRowStore::new();
        rows.expect_insert().never();
        let mut blobs = MockBlobStore::new();
        blobs.expect_save_upload().never();
        let posts = feed(auth, rows, blobs);

        let err = posts.create_post("   ", None).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));

        let upload = BlobUpload::new("photo.jpg", vec![0u8; 4]);
        let err = posts.create_post_with_image("", Some(upload)).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed(_)));
        assert!(posts.posts().await.is_empty());
    }

    #[tokio::test]
    async fn signed_out_create_is_rejected_and_nothing_is_prepended() {
        let mut auth = MockAuthSession::new();
        auth.expect_current_actor().returning(|| Ok(None));
        let mut rows = MockRowStore::new();
        rows.expect_insert().never();
        let posts = feed(auth, rows, MockBlobStore::new());

        let err = posts.create_post("hello", None).await.unwrap_err();
        assert_eq!(err, AppError::Unauthenticated);
        assert!(posts.posts().await.is_empty());
    }

    #[tokio::test]
    async fn failed_upload_aborts_post_creation() {
        let mut auth = MockAuthSession::new();
        auth.expect_current_actor()
            .returning(|| Ok(Some(ab_core::Actor::new(Uuid::new_v4(), None))));
        let mut rows = MockRowStore::new();
        rows.expect_insert().never();
        let mut blobs = MockBlobStore::new();
        blobs
            .expect_save_upload()
            .returning(|_, _, _, _| Err(AppError::unavailable("storage offline")));
        let posts = feed(auth, rows, blobs);

        let upload = BlobUpload::new("photo.jpg", vec![0u8; 4]);
        let err = posts.create_post_with_image("hello", Some(upload)).await.unwrap_err();
        assert!(matches!(err, AppError::BackendUnavailable(_)));
        assert!(posts.posts().await.is_empty());
    }
}
