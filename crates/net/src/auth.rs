use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use maud::Markup;
use tower_cookies::Cookies;

use lens_database::basic_db::SafeDatabase;
use lens_service::forms::{FormErrors, LoginForm, RegistrationForm};
use lens_service::ServiceError;

use crate::error::AppError;
use crate::flash::{push_flash, FlashLevel, FlashMessage};
use crate::render::{auth, PageContext};
use crate::session::{self, viewer};
use crate::state::AppState;

pub async fn login_form<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    cookies: Cookies,
) -> Result<Markup, AppError> {
    let viewer = viewer(&state.store, &cookies)?;
    let ctx = PageContext::new(&state, &cookies, viewer);
    Ok(auth::login_page(&ctx, "", &FormErrors::new()))
}

/// Wrong credentials redisplay the form with a message instead of failing.
pub async fn login_submit<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if let Err(errors) = form.clean() {
        let viewer = viewer(&state.store, &cookies)?;
        let ctx = PageContext::new(&state, &cookies, viewer);
        return Ok((StatusCode::BAD_REQUEST, auth::login_page(&ctx, &form.username, &errors)).into_response());
    }

    match state.store.authenticate(&form.username, &form.password)? {
        Some(user) => {
            session::login(&state.store, &cookies, user.id, &state.config)?;
            push_flash(&cookies, FlashLevel::Success, format!("Welcome back {}", user.username));
            Ok(Redirect::to("/").into_response())
        }
        None => {
            tracing::info!(username = %form.username, "rejected login");
            let viewer = viewer(&state.store, &cookies)?;
            let mut ctx = PageContext::new(&state, &cookies, viewer);
            ctx.messages.push(FlashMessage::new(
                FlashLevel::Error,
                "Invalid username or password.",
            ));
            Ok(auth::login_page(&ctx, &form.username, &FormErrors::new()).into_response())
        }
    }
}

pub async fn register_form<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    cookies: Cookies,
) -> Result<Markup, AppError> {
    let viewer = viewer(&state.store, &cookies)?;
    let ctx = PageContext::new(&state, &cookies, viewer);
    Ok(auth::register_page(&ctx, "", &FormErrors::new()))
}

pub async fn register_submit<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    cookies: Cookies,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, AppError> {
    let errors = match form.clean() {
        Ok(()) => match state.store.create_user(&form.username, &form.password1) {
            Ok(_) => {
                push_flash(&cookies, FlashLevel::Success, "User created successfully.");
                return Ok(Redirect::to("/login").into_response());
            }
            Err(ServiceError::UsernameTaken(_)) => {
                let mut errors = FormErrors::new();
                errors.insert(
                    "username".to_string(),
                    vec!["A user with that username already exists.".to_string()],
                );
                errors
            }
            Err(e) => return Err(e.into()),
        },
        Err(errors) => errors,
    };

    let viewer = viewer(&state.store, &cookies)?;
    let ctx = PageContext::new(&state, &cookies, viewer);
    Ok((StatusCode::BAD_REQUEST, auth::register_page(&ctx, &form.username, &errors)).into_response())
}

pub async fn logout<T: SafeDatabase>(
    State(state): State<AppState<T>>,
    cookies: Cookies,
) -> Result<Redirect, AppError> {
    session::logout(&state.store, &cookies)?;
    push_flash(&cookies, FlashLevel::Info, "Logged out successfully.");
    Ok(Redirect::to("/"))
}
