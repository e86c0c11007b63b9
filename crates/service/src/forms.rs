use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use validator::{Validate, ValidationErrors};

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]+$").expect("static username pattern"));

/// Field name to messages, ordered for stable rendering.
pub type FormErrors = BTreeMap<String, Vec<String>>;

/// Key for errors that belong to the whole submission rather than one field.
pub const NON_FIELD_ERRORS: &str = "__all__";

pub fn form_error(message: impl Into<String>) -> FormErrors {
    let mut errors = FormErrors::new();
    errors.insert(NON_FIELD_ERRORS.to_string(), vec![message.into()]);
    errors
}

pub fn field_messages(errors: &ValidationErrors) -> FormErrors {
    let mut out = FormErrors::new();
    for (field, field_errors) in errors.field_errors() {
        let messages = field_errors
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        out.insert(field.to_string(), messages);
    }
    out
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct LoginForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

impl LoginForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        self.validate().map_err(|e| field_messages(&e))
    }
}

#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct RegistrationForm {
    #[serde(default)]
    #[validate(
        length(min = 1, max = 150, message = "Enter a username of at most 150 characters."),
        regex(
            path = *USERNAME_RE,
            message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
        )
    )]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password1: String,
    #[serde(default)]
    #[validate(must_match(other = "password1", message = "The two password fields did not match."))]
    pub password2: String,
}

impl RegistrationForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        self.validate().map_err(|e| field_messages(&e))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowForm {
    pub profile_pk: u64,
}

/// Text fields of the profile edit form; the picture arrives separately as a
/// multipart file.
#[derive(Debug, Default, Clone, Validate)]
pub struct ProfileForm {
    #[validate(length(max = 500, message = "Ensure the biography has at most 500 characters."))]
    pub bio: String,
    pub birth_date: String,
}

impl ProfileForm {
    pub fn clean(&self) -> Result<Option<NaiveDate>, FormErrors> {
        let mut errors = match self.validate() {
            Ok(()) => FormErrors::new(),
            Err(e) => field_messages(&e),
        };

        let raw = self.birth_date.trim();
        let birth_date = if raw.is_empty() {
            None
        } else {
            match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors
                        .entry("birth_date".to_string())
                        .or_default()
                        .push("Enter a valid date.".to_string());
                    None
                }
            }
        };

        if errors.is_empty() {
            Ok(birth_date)
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Default, Clone, Validate)]
pub struct PostForm {
    #[validate(length(min = 1, max = 2200, message = "Write a caption of at most 2200 characters."))]
    pub caption: String,
}

impl PostForm {
    pub fn clean(&self) -> Result<(), FormErrors> {
        self.validate().map_err(|e| field_messages(&e))
    }
}
