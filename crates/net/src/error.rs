use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use lens_service::ServiceError;

use crate::render::error_page;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("login required")]
    LoginRequired,

    #[error(transparent)]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title, message) = match self {
            Self::LoginRequired => return Redirect::to("/login").into_response(),
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("Nothing here: {what}"),
            ),
            // a body over the upload limit surfaces here as 413
            Self::Multipart(err) => {
                let status = err.status();
                let title = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "Upload Too Large"
                } else {
                    "Bad Request"
                };
                (status, title, err.body_text())
            }
            Self::Service(ServiceError::ProfileNotFound(pk)) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("Profile {pk} does not exist."),
            ),
            Self::Service(ServiceError::InvalidImage(msg)) => {
                (StatusCode::BAD_REQUEST, "Bad Request", format!("Invalid image: {msg}"))
            }
            Self::Service(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Error",
                    "An internal error occurred. Please try again later.".to_string(),
                )
            }
        };

        (status, error_page(title, &message)).into_response()
    }
}
