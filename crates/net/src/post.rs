use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use maud::Markup;
use tower_cookies::Cookies;

use lens_database::basic_db::SafeDatabase;
use lens_service::forms::{form_error, FormErrors, PostForm};
use lens_service::media::StoredImage;

use crate::error::AppError;
use crate::flash::{push_flash, FlashLevel};
use crate::render::{feed, PageContext};
use crate::session::require_viewer;
use crate::state::AppState;

pub async fn post_create_form<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    cookies: Cookies,
) -> Result<Markup, AppError> {
    let viewer = require_viewer(&state.store, &cookies)?;
    let ctx = PageContext::new(&state, &cookies, Some(viewer));
    Ok(feed::post_create_page(&ctx, "", &FormErrors::new()))
}

pub async fn post_create_submit<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    cookies: Cookies,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let viewer = require_viewer(&state.store, &cookies)?;

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            let ctx = PageContext::new(&state, &cookies, Some(viewer));
            let page = feed::post_create_page(&ctx, "", &form_error(rejection.body_text()));
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
    };

    let mut form = PostForm::default();
    let mut upload: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "caption" => {
                form.caption = field.text().await?;
            }
            "image" => {
                let data = field.bytes().await?;
                if !data.is_empty() {
                    upload = Some(data.to_vec());
                }
            }
            _ => continue,
        }
    }

    let mut errors = form.clean().err().unwrap_or_default();

    let image = match upload.map(StoredImage::from_upload) {
        Some(Ok(image)) => Some(image),
        Some(Err(e)) => {
            errors.entry("image".to_string()).or_default().push(e.to_string());
            None
        }
        None => None,
    };

    if !errors.is_empty() {
        let ctx = PageContext::new(&state, &cookies, Some(viewer));
        let page = feed::post_create_page(&ctx, &form.caption, &errors);
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    state.store.create_post(&viewer.profile, &form.caption, image)?;

    push_flash(&cookies, FlashLevel::Success, "Post published.");
    Ok(Redirect::to("/").into_response())
}
