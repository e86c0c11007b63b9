use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use lens_database::basic_db::SafeDatabase;
use lens_service::ServiceError;

use crate::error::AppError;
use crate::state::AppState;

fn image_response<T: SafeDatabase>(state: &AppState<T>, reference: &str) -> Result<Response, AppError> {
    let image = state
        .store
        .image(reference)?
        .ok_or_else(|| AppError::NotFound(reference.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        image.data,
    )
        .into_response())
}

pub async fn profile_picture<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    Path(pk): Path<u64>,
) -> Result<Response, AppError> {
    let profile = state
        .store
        .profile(pk)?
        .ok_or(ServiceError::ProfileNotFound(pk))?;
    let reference = profile
        .profile_picture
        .ok_or_else(|| AppError::NotFound(format!("picture of profile {pk}")))?;

    image_response(&state, &reference)
}

pub async fn post_image<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    Path(pk): Path<u64>,
) -> Result<Response, AppError> {
    let post = state
        .store
        .post(pk)?
        .ok_or_else(|| AppError::NotFound(format!("post {pk}")))?;
    let reference = post
        .image
        .ok_or_else(|| AppError::NotFound(format!("image of post {pk}")))?;

    image_response(&state, &reference)
}
