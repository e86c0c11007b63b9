use axum::extract::State;
use maud::Markup;
use tower_cookies::Cookies;

use lens_database::basic_db::SafeDatabase;

use crate::error::AppError;
use crate::render::{feed, PageContext};
use crate::session::viewer;
use crate::state::AppState;

/// How many posts anonymous visitors see.
pub const PUBLIC_FEED_LEN: usize = 5;

/// Followed users' posts for members, the latest few for everyone else.
pub async fn home<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    cookies: Cookies,
) -> Result<Markup, AppError> {
    let viewer = viewer(&state.store, &cookies)?;

    let posts = match &viewer {
        Some(v) => state.store.feed_for(v.profile.id)?,
        None => state.store.recent_posts(PUBLIC_FEED_LEN)?,
    };

    let ctx = PageContext::new(&state, &cookies, viewer);
    Ok(feed::home_page(&ctx, &posts))
}
