use ab_community::{CommunityOptions, NewEvent};
use ab_core::{AppError, BlobUpload, Clock, Table};
use chrono::Duration;
use integration_tests::{epoch, Harness};
use serde_json::json;
use uuid::Uuid;

fn row(value: serde_json::Value) -> ab_core::Row {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn expired_stories_never_appear_at_any_clock_time() {
    let h = Harness::new();
    let author = Uuid::new_v4();
    // Created one hour apart; each expires 24h after creation.
    for hour in 0..4 {
        let created = epoch() + Duration::hours(hour);
        h.backend.seed(
            Table::Stories,
            row(json!({
                "id": Uuid::new_v4(),
                "user_id": author,
                "media_url": format!("memory://storage/stories/{hour}.jpg"),
                "created_at": created,
                "expires_at": created + Duration::hours(24),
            })),
        );
    }
    let stories = h.community.stories();

    for offset in [0, 23, 24, 25, 26, 27, 28] {
        let now = epoch() + Duration::hours(offset);
        h.clock.set(now);
        let visible = stories.refresh().await;

        assert!(visible.iter().all(|s| s.story.expires_at >= now), "at +{offset}h");
        let expected = (0..4).filter(|hour| hour + 24 >= offset).count();
        assert_eq!(visible.len(), expected, "at +{offset}h");
        assert!(visible
            .windows(2)
            .all(|w| w[0].story.created_at >= w[1].story.created_at));
    }
}

#[tokio::test]
async fn story_expiry_boundary_is_inclusive() {
    let h = Harness::new();
    h.sign_in("yui@example.com");
    let stories = h.community.stories();
    let created = stories.create_story("memory://storage/stories/a.jpg").await.unwrap();
    assert_eq!(created.story.expires_at, epoch() + Duration::hours(24));

    h.advance(Duration::hours(24));
    assert_eq!(stories.refresh().await.len(), 1);
    h.advance(Duration::seconds(1));
    assert!(stories.refresh().await.is_empty());
}

#[tokio::test]
async fn story_ttl_follows_options() {
    let h = Harness::with_options(CommunityOptions {
        story_ttl: Duration::hours(6),
        ..CommunityOptions::default()
    });
    h.sign_in("yui@example.com");
    let view = h
        .community
        .stories()
        .create_story("memory://storage/stories/b.jpg")
        .await
        .unwrap();
    assert_eq!(view.story.expires_at - view.story.created_at, Duration::hours(6));
}

#[tokio::test]
async fn failed_media_upload_publishes_no_story() {
    let h = Harness::new();
    h.sign_in("lena@example.com");
    h.backend.set_blobs_offline(true);
    let stories = h.community.stories();

    let err = stories
        .create_story_with_media(BlobUpload::new("harbour.jpg", vec![0xffu8, 0xd8]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BackendUnavailable(_)));
    assert_eq!(h.backend.row_count(Table::Stories), 0);
    assert!(stories.stories().await.is_empty());
}

#[tokio::test]
async fn events_are_upcoming_and_soonest_first() {
    let h = Harness::new();
    h.sign_in("host@example.com");
    let events = h.community.events();

    for (title, days) in [("later", 5), ("soon", 1), ("middle", 3)] {
        events
            .create_event(NewEvent::new(title, epoch() + Duration::days(days)))
            .await
            .unwrap();
    }
    // Local inserts keep start-time order.
    let titles: Vec<_> = events.events().await.into_iter().map(|e| e.event.title).collect();
    assert_eq!(titles, ["soon", "middle", "later"]);

    // An event that already started is stored but not listed.
    events
        .create_event(NewEvent::new("yesterday", epoch() - Duration::days(1)))
        .await
        .unwrap();
    assert_eq!(events.events().await.len(), 3);
    assert_eq!(h.backend.row_count(Table::Events), 4);

    for (offset, expected) in [(0, 3), (2, 2), (4, 1), (6, 0)] {
        h.clock.set(epoch() + Duration::days(offset));
        let now = h.clock.now();
        let listed = events.refresh().await;
        assert_eq!(listed.len(), expected, "at +{offset}d");
        assert!(listed.iter().all(|e| e.event.start_time >= now));
        assert!(listed
            .windows(2)
            .all(|w| w[0].event.start_time <= w[1].event.start_time));
    }
}
