use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::FormRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use maud::Markup;
use tower_cookies::Cookies;

use lens_database::basic_db::SafeDatabase;
use lens_service::forms::{form_error, FollowForm, FormErrors, ProfileForm};
use lens_service::media::StoredImage;
use lens_service::parser::follow::FollowToggle;
use lens_service::parser::profile::{PictureChange, ProfileChanges, UserProfile};
use lens_service::ServiceError;

use crate::error::AppError;
use crate::flash::{push_flash, FlashLevel, FlashMessage};
use crate::render::profile::{self as render, ProfileDetail};
use crate::render::PageContext;
use crate::session::{require_viewer, Viewer};
use crate::state::AppState;

const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
const UPLOAD_AND_CLEAR: &str = "Please either submit a file or check the clear checkbox, not both.";

fn load_profile<T: SafeDatabase>(state: &AppState<T>, pk: u64) -> Result<UserProfile, AppError> {
    Ok(state
        .store
        .profile(pk)?
        .ok_or(ServiceError::ProfileNotFound(pk))?)
}

fn detail_url(pk: u64) -> String {
    format!("/profile_detail/{pk}")
}

fn render_detail<T: SafeDatabase>(
    state: &AppState<T>,
    cookies: &Cookies,
    viewer: Viewer,
    profile: &UserProfile,
    error: Option<String>,
) -> Result<Markup, AppError> {
    let following = state.store.is_following(viewer.profile.id, profile.id)?;
    let counts = state.store.follow_counts(profile.id)?;
    let posts = state.store.posts_by(profile.user_id)?;

    let mut ctx = PageContext::new(state, cookies, Some(viewer));
    if let Some(error) = error {
        ctx.messages.push(FlashMessage::new(FlashLevel::Error, error));
    }

    let detail = ProfileDetail {
        profile,
        following,
        counts,
        posts: &posts,
    };
    Ok(render::detail_page(&ctx, &detail))
}

pub async fn profile_detail<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    Path(pk): Path<u64>,
    cookies: Cookies,
) -> Result<Markup, AppError> {
    let viewer = require_viewer(&state.store, &cookies)?;
    let profile = load_profile(&state, pk)?;

    render_detail(&state, &cookies, viewer, &profile, None)
}

/// Follow form: the same submission follows or unfollows depending on
/// whether the edge already exists.
pub async fn profile_follow<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    Path(pk): Path<u64>,
    cookies: Cookies,
    form: Result<Form<FollowForm>, FormRejection>,
) -> Result<Response, AppError> {
    let viewer = require_viewer(&state.store, &cookies)?;
    let profile = load_profile(&state, pk)?;

    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::debug!(error = %rejection, profile_id = pk, "malformed follow form");
            let page = render_detail(&state, &cookies, viewer, &profile, Some("Invalid follow request.".to_string()))?;
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
    };
    let target = load_profile(&state, form.profile_pk)?;

    match state.store.toggle_follow(viewer.profile.id, target.id) {
        Ok(FollowToggle::Followed) => {
            push_flash(&cookies, FlashLevel::Success, format!("Following {}", target.username));
        }
        Ok(FollowToggle::Unfollowed) => {
            push_flash(&cookies, FlashLevel::Success, format!("Unfollowed {}", target.username));
        }
        Err(ServiceError::SelfFollow) => {
            push_flash(&cookies, FlashLevel::Error, "You cannot follow yourself.");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(&detail_url(pk)).into_response())
}

pub async fn profile_list<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    cookies: Cookies,
) -> Result<Markup, AppError> {
    let viewer = require_viewer(&state.store, &cookies)?;
    let profiles = state.store.profiles_except(Some(viewer.user.id))?;

    let ctx = PageContext::new(&state, &cookies, Some(viewer));
    Ok(render::list_page(&ctx, &profiles))
}

pub async fn profile_update_form<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    Path(pk): Path<u64>,
    cookies: Cookies,
) -> Result<Response, AppError> {
    let viewer = require_viewer(&state.store, &cookies)?;
    let profile = load_profile(&state, pk)?;

    if profile.user_id != viewer.user.id {
        return Ok(Redirect::to("/").into_response());
    }

    let birth_date = profile
        .birth_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default();

    let ctx = PageContext::new(&state, &cookies, Some(viewer));
    Ok(render::update_page(&ctx, &profile, &profile.bio, &birth_date, &FormErrors::new()).into_response())
}

/// Only the owner may edit; anyone else is sent back home.
pub async fn profile_update_submit<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    Path(pk): Path<u64>,
    cookies: Cookies,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let viewer = require_viewer(&state.store, &cookies)?;
    let profile = load_profile(&state, pk)?;

    if profile.user_id != viewer.user.id {
        tracing::warn!(user_id = viewer.user.id, profile_id = pk, "refused edit of foreign profile");
        return Ok(Redirect::to("/").into_response());
    }

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            let birth_date = profile
                .birth_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let ctx = PageContext::new(&state, &cookies, Some(viewer));
            let errors = form_error(rejection.body_text());
            let page = render::update_page(&ctx, &profile, &profile.bio, &birth_date, &errors);
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
    };

    let mut form = ProfileForm::default();
    let mut upload: Option<Vec<u8>> = None;
    let mut clear_picture = false;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "bio" => {
                form.bio = field.text().await?;
            }
            "birth_date" => {
                form.birth_date = field.text().await?;
            }
            "profile_picture-clear" => {
                clear_picture = true;
            }
            "profile_picture" => {
                let data = field.bytes().await?;

                // browsers send an empty part when no file was chosen
                if !data.is_empty() {
                    upload = Some(data.to_vec());
                }
            }
            _ => continue,
        }
    }

    let (birth_date, mut errors) = match form.clean() {
        Ok(date) => (date, FormErrors::new()),
        Err(field_errors) => (None, field_errors),
    };

    let picture = match upload {
        Some(_) if clear_picture => {
            errors
                .entry("profile_picture".to_string())
                .or_default()
                .push(UPLOAD_AND_CLEAR.to_string());
            PictureChange::Keep
        }
        Some(data) => match StoredImage::from_upload(data) {
            Ok(image) => PictureChange::Replace(image),
            Err(_) => {
                errors
                    .entry("profile_picture".to_string())
                    .or_default()
                    .push(INVALID_IMAGE.to_string());
                PictureChange::Keep
            }
        },
        None if clear_picture => PictureChange::Clear,
        None => PictureChange::Keep,
    };

    if !errors.is_empty() {
        let ctx = PageContext::new(&state, &cookies, Some(viewer));
        let page = render::update_page(&ctx, &profile, &form.bio, &form.birth_date, &errors);
        return Ok((StatusCode::BAD_REQUEST, page).into_response());
    }

    state.store.update_profile(
        profile.id,
        ProfileChanges {
            bio: form.bio,
            birth_date,
            picture,
        },
    )?;

    push_flash(&cookies, FlashLevel::Success, "Profile updated successfully.");
    Ok(Redirect::to(&detail_url(profile.id)).into_response())
}
