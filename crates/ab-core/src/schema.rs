//! Backend table and bucket names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relational tables exposed by the hosted backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Profiles,
    Posts,
    Likes,
    Comments,
    Stories,
    Groups,
    GroupMembers,
    Events,
    EventAttendees,
    Mentors,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Profiles => "profiles",
            Table::Posts => "posts",
            Table::Likes => "likes",
            Table::Comments => "comments",
            Table::Stories => "stories",
            Table::Groups => "groups",
            Table::GroupMembers => "group_members",
            Table::Events => "events",
            Table::EventAttendees => "event_attendees",
            Table::Mentors => "mentors",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Object storage buckets. Every bucket serves public URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    Avatars,
    Posts,
    Stories,
    Groups,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Avatars => "avatars",
            Bucket::Posts => "posts",
            Bucket::Stories => "stories",
            Bucket::Groups => "groups",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
