use std::collections::HashSet;

use chrono::{Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use lens_database::basic_db::{numeric_key, SafeDatabase};

use crate::error::ServiceError;
use crate::media::StoredImage;
use crate::parser::follow::{Follow, FollowToggle};
use crate::parser::post::Post;
use crate::parser::profile::{FollowCounts, PictureChange, ProfileChanges, UserProfile};
use crate::parser::session::Session;
use crate::parser::user::User;
use crate::password::{hash_password, verify_password};

const USERS: &str = "users";
const USERNAMES: &str = "usernames";
const PROFILES: &str = "user_profiles";
const PROFILES_BY_USER: &str = "profiles_by_user";
const FOLLOWS: &str = "follows";
const POSTS: &str = "posts";
const IMAGES: &str = "images";
const SESSIONS: &str = "sessions";

/// Two weeks.
pub const DEFAULT_SESSION_AGE_SECS: u64 = 14 * 24 * 60 * 60;

/// Typed access to the application's tables.
#[derive(Clone)]
pub struct Store<T> {
    database: T,
    session_age: Duration,
}

impl<T: SafeDatabase> Store<T> {
    pub fn new(database: T) -> Self {
        Self {
            database,
            session_age: Duration::seconds(DEFAULT_SESSION_AGE_SECS as i64),
        }
    }

    /// Sessions older than `secs` stop resolving.
    pub fn with_session_age(mut self, secs: u64) -> Self {
        let secs = secs.min(i64::MAX as u64 / 1000) as i64;
        self.session_age = Duration::seconds(secs);
        self
    }

    fn get<R: DeserializeOwned>(&self, key: &str, table: &str) -> Result<Option<R>, ServiceError> {
        match self.database.read(key, table)? {
            Some(data) => {
                let text = String::from_utf8(data)?;
                Ok(Some(serde_json::from_str(&text)?))
            }
            None => Ok(None),
        }
    }

    fn put<R: Serialize>(&self, key: &str, record: &R, table: &str) -> Result<(), ServiceError> {
        let json = serde_json::to_string(record)?;
        self.database.write(key, &json, table)?;
        Ok(())
    }

    /// Records whose key starts with `prefix`, in key order.
    fn scan<R: DeserializeOwned>(&self, prefix: &str, table: &str) -> Result<Vec<R>, ServiceError> {
        let mut records = Vec::new();
        for (_, value) in self.database.read_prefix(prefix, table)? {
            let text = String::from_utf8(value)?;
            records.push(serde_json::from_str(&text)?);
        }
        Ok(records)
    }

    // users and sessions

    /// Creates the user and the profile that belongs to it.
    pub fn create_user(&self, username: &str, password: &str) -> Result<(User, UserProfile), ServiceError> {
        let password_hash = hash_password(password)?;

        // name first, then id: a refused duplicate allocates nothing
        if !self.database.insert_new(username, "", USERNAMES)? {
            return Err(ServiceError::UsernameTaken(username.to_string()));
        }
        let user_id = self.database.next_id(USERS)?;
        self.database.write(username, &user_id.to_string(), USERNAMES)?;

        let user = User {
            id: user_id,
            username: username.to_string(),
            password_hash,
            date_joined: Utc::now(),
        };
        self.put(&numeric_key(user.id), &user, USERS)?;

        let profile = UserProfile {
            id: self.database.next_id(PROFILES)?,
            user_id: user.id,
            username: user.username.clone(),
            profile_picture: None,
            bio: String::new(),
            birth_date: None,
        };
        self.put(&numeric_key(profile.id), &profile, PROFILES)?;
        self.database
            .write(&numeric_key(user.id), &profile.id.to_string(), PROFILES_BY_USER)?;

        tracing::info!(user_id = user.id, profile_id = profile.id, username = %user.username, "user registered");
        Ok((user, profile))
    }

    pub fn user(&self, id: u64) -> Result<Option<User>, ServiceError> {
        self.get(&numeric_key(id), USERS)
    }

    pub fn user_by_username(&self, username: &str) -> Result<Option<User>, ServiceError> {
        let Some(raw) = self.database.read(username, USERNAMES)? else {
            return Ok(None);
        };
        match String::from_utf8(raw)?.parse::<u64>() {
            Ok(id) => self.user(id),
            Err(_) => Ok(None),
        }
    }

    /// Returns the user only when the password matches.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>, ServiceError> {
        let user = self.user_by_username(username)?;
        Ok(user.filter(|u| verify_password(&u.password_hash, password)))
    }

    pub fn start_session(&self, user_id: u64) -> Result<String, ServiceError> {
        let token = Uuid::new_v4().simple().to_string();
        let session = Session {
            user_id,
            created_at: Utc::now(),
        };
        self.put(&token, &session, SESSIONS)?;
        Ok(token)
    }

    /// Expired sessions resolve to nobody and are removed on sight.
    pub fn session_user(&self, token: &str) -> Result<Option<User>, ServiceError> {
        let Some(session) = self.get::<Session>(token, SESSIONS)? else {
            return Ok(None);
        };

        let expired = session
            .created_at
            .checked_add_signed(self.session_age)
            .is_some_and(|deadline| deadline <= Utc::now());
        if expired {
            self.database.delete(token, SESSIONS)?;
            tracing::info!(user_id = session.user_id, "session expired");
            return Ok(None);
        }

        self.user(session.user_id)
    }

    pub fn end_session(&self, token: &str) -> Result<bool, ServiceError> {
        Ok(self.database.delete(token, SESSIONS)?)
    }

    // profiles

    pub fn profile(&self, pk: u64) -> Result<Option<UserProfile>, ServiceError> {
        self.get(&numeric_key(pk), PROFILES)
    }

    pub fn profile_for_user(&self, user_id: u64) -> Result<Option<UserProfile>, ServiceError> {
        let Some(raw) = self.database.read(&numeric_key(user_id), PROFILES_BY_USER)? else {
            return Ok(None);
        };
        match String::from_utf8(raw)?.parse::<u64>() {
            Ok(pk) => self.profile(pk),
            Err(_) => Ok(None),
        }
    }

    /// All profiles ordered by username, leaving out `exclude_user` if given.
    pub fn profiles_except(&self, exclude_user: Option<u64>) -> Result<Vec<UserProfile>, ServiceError> {
        let mut profiles: Vec<UserProfile> = self
            .scan::<UserProfile>("", PROFILES)?
            .into_iter()
            .filter(|p| Some(p.user_id) != exclude_user)
            .collect();
        profiles.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(profiles)
    }

    pub fn update_profile(&self, pk: u64, changes: ProfileChanges) -> Result<UserProfile, ServiceError> {
        let mut profile = self.profile(pk)?.ok_or(ServiceError::ProfileNotFound(pk))?;

        profile.bio = changes.bio;
        profile.birth_date = changes.birth_date;

        match changes.picture {
            PictureChange::Keep => {}
            PictureChange::Clear => {
                if let Some(reference) = profile.profile_picture.take() {
                    self.database.delete(&reference, IMAGES)?;
                }
            }
            PictureChange::Replace(image) => {
                let reference = UserProfile::picture_reference(profile.id);
                self.put(&reference, &image, IMAGES)?;
                profile.profile_picture = Some(reference);
            }
        }

        self.put(&numeric_key(profile.id), &profile, PROFILES)?;
        tracing::info!(profile_id = profile.id, "profile updated");
        Ok(profile)
    }

    // follows

    /// Removes the edge if it exists, creates it otherwise.
    pub fn toggle_follow(&self, follower: u64, following: u64) -> Result<FollowToggle, ServiceError> {
        if follower == following {
            return Err(ServiceError::SelfFollow);
        }
        if self.profile(following)?.is_none() {
            return Err(ServiceError::ProfileNotFound(following));
        }

        let edge = Follow {
            follower,
            following,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&edge)?;
        let keys = [
            Follow::key(follower, following),
            Follow::reverse_key(follower, following),
        ];
        let inserted = self
            .database
            .toggle(&[keys[0].as_str(), keys[1].as_str()], &json, FOLLOWS)?;

        let outcome = if inserted {
            FollowToggle::Followed
        } else {
            FollowToggle::Unfollowed
        };
        tracing::info!(follower, following, ?outcome, "follow toggled");
        Ok(outcome)
    }

    pub fn is_following(&self, follower: u64, following: u64) -> Result<bool, ServiceError> {
        Ok(self
            .database
            .read(&Follow::key(follower, following), FOLLOWS)?
            .is_some())
    }

    /// Profile ids that `follower` follows.
    pub fn following_ids(&self, follower: u64) -> Result<Vec<u64>, ServiceError> {
        Ok(self
            .scan::<Follow>(&Follow::follower_prefix(follower), FOLLOWS)?
            .into_iter()
            .map(|f| f.following)
            .collect())
    }

    pub fn follow_counts(&self, pk: u64) -> Result<FollowCounts, ServiceError> {
        Ok(FollowCounts {
            followers: self.database.count_prefix(&Follow::followed_prefix(pk), FOLLOWS)?,
            following: self.database.count_prefix(&Follow::follower_prefix(pk), FOLLOWS)?,
        })
    }

    // posts

    pub fn create_post(
        &self,
        author: &UserProfile,
        caption: &str,
        image: Option<StoredImage>,
    ) -> Result<Post, ServiceError> {
        let id = self.database.next_id(POSTS)?;

        let image = match image {
            Some(stored) => {
                let reference = Post::image_reference(id);
                self.put(&reference, &stored, IMAGES)?;
                Some(reference)
            }
            None => None,
        };

        let post = Post {
            id,
            user_id: author.user_id,
            profile_id: author.id,
            username: author.username.clone(),
            caption: caption.to_string(),
            image,
            created_at: Utc::now(),
        };
        self.put(&numeric_key(post.id), &post, POSTS)?;

        tracing::info!(post_id = post.id, user_id = author.user_id, "post created");
        Ok(post)
    }

    pub fn post(&self, id: u64) -> Result<Option<Post>, ServiceError> {
        self.get(&numeric_key(id), POSTS)
    }

    /// Newest first. Ids are allocated in creation order.
    fn posts_newest_first(&self) -> Result<Vec<Post>, ServiceError> {
        let mut posts = self.scan::<Post>("", POSTS)?;
        posts.reverse();
        Ok(posts)
    }

    pub fn recent_posts(&self, limit: usize) -> Result<Vec<Post>, ServiceError> {
        let mut posts = self.posts_newest_first()?;
        posts.truncate(limit);
        Ok(posts)
    }

    /// Posts written by the users behind the profiles `profile_pk` follows.
    pub fn feed_for(&self, profile_pk: u64) -> Result<Vec<Post>, ServiceError> {
        let mut authors = HashSet::new();
        for pk in self.following_ids(profile_pk)? {
            if let Some(profile) = self.profile(pk)? {
                authors.insert(profile.user_id);
            }
        }

        Ok(self
            .posts_newest_first()?
            .into_iter()
            .filter(|p| authors.contains(&p.user_id))
            .collect())
    }

    pub fn posts_by(&self, user_id: u64) -> Result<Vec<Post>, ServiceError> {
        Ok(self
            .posts_newest_first()?
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .collect())
    }

    pub fn image(&self, reference: &str) -> Result<Option<StoredImage>, ServiceError> {
        self.get(reference, IMAGES)
    }
}
