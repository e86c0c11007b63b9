use tower_cookies::cookie::time::Duration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};

use lens_database::basic_db::SafeDatabase;
use lens_service::parser::profile::UserProfile;
use lens_service::parser::user::User;
use lens_service::Store;

use crate::config::Config;
use crate::error::AppError;

pub const SESSION_COOKIE: &str = "sessionid";

/// The logged-in visitor.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub user: User,
    pub profile: UserProfile,
}

pub fn viewer<T: SafeDatabase>(store: &Store<T>, cookies: &Cookies) -> Result<Option<Viewer>, AppError> {
    let Some(cookie) = cookies.get(SESSION_COOKIE) else {
        return Ok(None);
    };
    let Some(user) = store.session_user(cookie.value())? else {
        return Ok(None);
    };

    let profile = store
        .profile_for_user(user.id)?
        .ok_or_else(|| AppError::NotFound(format!("profile of user {}", user.id)))?;

    Ok(Some(Viewer { user, profile }))
}

/// Like [`viewer`], but anonymous visitors get [`AppError::LoginRequired`].
pub fn require_viewer<T: SafeDatabase>(store: &Store<T>, cookies: &Cookies) -> Result<Viewer, AppError> {
    viewer(store, cookies)?.ok_or(AppError::LoginRequired)
}

/// Starts a fresh session for `user_id`, replacing any session the browser
/// already carried.
pub fn login<T: SafeDatabase>(
    store: &Store<T>,
    cookies: &Cookies,
    user_id: u64,
    config: &Config,
) -> Result<(), AppError> {
    if let Some(previous) = cookies.get(SESSION_COOKIE) {
        store.end_session(previous.value())?;
    }

    let token = store.start_session(user_id)?;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies)
        .max_age(Duration::seconds(config.session_age_secs.min(i64::MAX as u64) as i64))
        .build();
    cookies.add(cookie);

    tracing::info!(user_id, "session started");
    Ok(())
}

pub fn logout<T: SafeDatabase>(store: &Store<T>, cookies: &Cookies) -> Result<(), AppError> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        store.end_session(cookie.value())?;

        let mut removal = Cookie::new(SESSION_COOKIE, "");
        removal.set_path("/");
        cookies.remove(removal);
    }
    Ok(())
}
