use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    /// PHC string produced by argon2.
    pub password_hash: String,
    pub date_joined: DateTime<Utc>,
}
