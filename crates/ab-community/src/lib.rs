//! # ab-community
//!
//! Entity access modules for the community side of abroad: profiles, posts,
//! stories, groups, events and mentorship. Each feed keeps an ordered
//! in-memory copy of its records, re-fetched from the backend on `refresh()`
//! and after every relation toggle.

pub mod events;
pub mod feed;
pub mod groups;
pub mod mentors;
pub mod posts;
pub mod profiles;
pub mod relation;
pub mod stories;

use std::sync::Arc;

use ab_core::{BackendClient, Clock};
use chrono::Duration;

pub use events::{EventFeed, NewEvent};
pub use feed::LoadPhase;
pub use groups::{GroupFeed, NewGroup};
pub use mentors::{MentorApplication, MentorRegistry};
pub use posts::PostFeed;
pub use profiles::ProfileDirectory;
pub use relation::{RelationStats, ToggleOutcome};
pub use stories::StoryFeed;

/// Tunables shared by the feeds.
#[derive(Debug, Clone, Copy)]
pub struct CommunityOptions {
    /// Lifetime of a new story
    pub story_ttl: Duration,
    /// Check for an existing (entity, actor) row before inserting a like,
    /// membership or attendance.
    pub duplicate_guard: bool,
}

impl Default for CommunityOptions {
    fn default() -> Self {
        Self {
            story_ttl: Duration::hours(24),
            duplicate_guard: true,
        }
    }
}

/// Builds feeds that share one backend client and clock.
#[derive(Clone)]
pub struct Community {
    client: Arc<BackendClient>,
    clock: Arc<dyn Clock>,
    options: CommunityOptions,
}

impl Community {
    pub fn new(client: Arc<BackendClient>, clock: Arc<dyn Clock>, options: CommunityOptions) -> Self {
        Self {
            client,
            clock,
            options,
        }
    }

    pub fn client(&self) -> &Arc<BackendClient> {
        &self.client
    }

    pub fn profiles(&self) -> ProfileDirectory {
        ProfileDirectory::new(self.client.clone())
    }

    pub fn posts(&self) -> PostFeed {
        PostFeed::new(self.client.clone(), self.options)
    }

    pub fn stories(&self) -> StoryFeed {
        StoryFeed::new(self.client.clone(), self.clock.clone(), self.options)
    }

    pub fn groups(&self) -> GroupFeed {
        GroupFeed::new(self.client.clone(), self.options)
    }

    pub fn events(&self) -> EventFeed {
        EventFeed::new(self.client.clone(), self.clock.clone(), self.options)
    }

    pub fn mentors(&self) -> MentorRegistry {
        MentorRegistry::new(self.client.clone())
    }
}
