use axum::extract::State;
use maud::Markup;
use tower_cookies::Cookies;

use lens_database::basic_db::SafeDatabase;

use crate::error::AppError;
use crate::render::{pages, PageContext};
use crate::session::viewer;
use crate::state::AppState;

pub async fn legal<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    cookies: Cookies,
) -> Result<Markup, AppError> {
    let viewer = viewer(&state.store, &cookies)?;
    let ctx = PageContext::new(&state, &cookies, viewer);
    Ok(pages::legal_page(&ctx))
}

pub async fn contact<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    cookies: Cookies,
) -> Result<Markup, AppError> {
    let viewer = viewer(&state.store, &cookies)?;
    let ctx = PageContext::new(&state, &cookies, viewer);
    Ok(pages::contact_page(&ctx))
}
