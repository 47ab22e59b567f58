//! Event feed: upcoming events soonest-first with attendee counts and
//! whether the current actor attends.

use std::sync::Arc;

use ab_core::{BackendClient, Clock, Event, EventView, Result, RowQuery, Table};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::feed::{require_text, FeedState, LoadPhase};
use crate::relation::{self, ToggleOutcome, ATTENDEES};
use crate::CommunityOptions;

/// Caller-supplied fields for a new event.
#[derive(Debug, Clone, Serialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
}

impl NewEvent {
    pub fn new(title: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: None,
            location: None,
            start_time,
            end_time: None,
            group_id: None,
        }
    }
}

#[derive(Serialize)]
struct NewEventRow<'a> {
    #[serde(flatten)]
    event: &'a NewEvent,
    created_by: Uuid,
}

pub struct EventFeed {
    client: Arc<BackendClient>,
    clock: Arc<dyn Clock>,
    options: CommunityOptions,
    state: FeedState<EventView>,
}

impl EventFeed {
    pub fn new(client: Arc<BackendClient>, clock: Arc<dyn Clock>, options: CommunityOptions) -> Self {
        Self {
            client,
            clock,
            options,
            state: FeedState::new(),
        }
    }

    /// Events with `start_time >= now`, soonest first.
    pub async fn fetch(&self) -> Result<Vec<EventView>> {
        let now = self.clock.now();
        let actor = self.client.current_actor().await?.map(|a| a.id);
        let query = RowQuery::new()
            .gte("start_time", now)
            .order_by("start_time", true);
        let mut events: Vec<Event> = self.client.query(Table::Events, &query).await?;
        events.retain(|e| e.start_time >= now);
        events.sort_by(|a, b| a.start_time.cmp(&b.start_time));

        let ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
        let attendees = relation::relation_stats(&self.client, ATTENDEES, &ids, actor).await?;
        Ok(events
            .into_iter()
            .map(|event| {
                let stats = attendees.get(&event.id).copied().unwrap_or_default();
                EventView {
                    event,
                    attendee_count: stats.count,
                    is_attending: stats.includes_actor,
                }
            })
            .collect())
    }

    pub async fn refresh(&self) -> Vec<EventView> {
        self.state.run_refresh("events", self.fetch()).await
    }

    pub async fn events(&self) -> Vec<EventView> {
        self.state.snapshot().await
    }

    pub async fn phase(&self) -> LoadPhase {
        self.state.phase().await
    }

    pub fn unmount(&self) {
        self.state.unmount();
    }

    /// Creates an event. The new record lands in start-time order; an event
    /// that already started is stored but stays out of the feed.
    pub async fn create_event(&self, new_event: NewEvent) -> Result<EventView> {
        require_text("title", &new_event.title)?;
        let actor = self.client.require_actor().await?;

        let row = NewEventRow {
            event: &new_event,
            created_by: actor.id,
        };
        let event: Event = self
            .client
            .insert(Table::Events, &row)
            .await
            .inspect_err(|e| warn!(actor_id = %actor.id, error = %e, "event creation failed"))?;

        let view = EventView {
            event,
            attendee_count: 0,
            is_attending: false,
        };
        if view.event.start_time >= self.clock.now() {
            let start = view.event.start_time;
            self.state
                .insert_with(view.clone(), |items| {
                    items.partition_point(|e| e.event.start_time <= start)
                })
                .await;
        } else {
            debug!(event_id = %view.event.id, "created event already started; not listed");
        }
        info!(event_id = %view.event.id, start_time = %view.event.start_time, "event created");
        Ok(view)
    }

    /// Marks the current actor as attending. Calling this twice before either
    /// refresh completes can write two attendee rows (see `ToggleOutcome`).
    pub async fn attend_event(&self, event_id: Uuid) -> Result<ToggleOutcome> {
        let outcome =
            relation::toggle(&self.client, ATTENDEES, event_id, self.options.duplicate_guard)
                .await?;
        self.refresh().await;
        Ok(outcome)
    }
}
