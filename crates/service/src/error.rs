use lens_database::basic_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("database error: {0}")]
    Database(#[from] DbError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UTF-8 in stored record: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("a user with username {0} already exists")]
    UsernameTaken(String),

    #[error("profile {0} not found")]
    ProfileNotFound(u64),

    #[error("a profile cannot follow itself")]
    SelfFollow,

    #[error("invalid image: {0}")]
    InvalidImage(String),
}
