use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::media::StoredImage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub user_id: u64,
    pub username: String,              // copied from the user, usernames never change
    pub profile_picture: Option<String>,  // key into the images table
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
}

impl UserProfile {
    pub fn picture_reference(id: u64) -> String {
        format!("profile_pictures/{id}")
    }
}

/// What to do with the stored picture on update.
#[derive(Debug)]
pub enum PictureChange {
    Keep,
    Clear,
    Replace(StoredImage),
}

#[derive(Debug)]
pub struct ProfileChanges {
    pub bio: String,
    pub birth_date: Option<NaiveDate>,
    pub picture: PictureChange,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowCounts {
    pub followers: usize,
    pub following: usize,
}
