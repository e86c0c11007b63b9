use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lens_database::basic_db::numeric_key;

/// Directed edge between two profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Follow {
    pub follower: u64,
    pub following: u64,
    pub created_at: DateTime<Utc>,
}

impl Follow {
    /// One key per (follower, following) pair, so an edge can only exist once.
    pub fn key(follower: u64, following: u64) -> String {
        format!("out:{}:{}", numeric_key(follower), numeric_key(following))
    }

    /// Mirror of [`Follow::key`] indexed by the followed profile.
    pub fn reverse_key(follower: u64, following: u64) -> String {
        format!("in:{}:{}", numeric_key(following), numeric_key(follower))
    }

    pub fn follower_prefix(follower: u64) -> String {
        format!("out:{}:", numeric_key(follower))
    }

    pub fn followed_prefix(following: u64) -> String {
        format!("in:{}:", numeric_key(following))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowToggle {
    Followed,
    Unfollowed,
}
