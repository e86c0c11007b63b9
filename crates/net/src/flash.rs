use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};

const FLASH_COOKIE_NAME: &str = "_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

impl FlashLevel {
    pub fn css_class(self) -> &'static str {
        match self {
            FlashLevel::Success => "flash flash-success",
            FlashLevel::Info => "flash flash-info",
            FlashLevel::Error => "flash flash-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

impl FlashMessage {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

fn read(cookies: &Cookies) -> Vec<FlashMessage> {
    cookies
        .get(FLASH_COOKIE_NAME)
        .and_then(|cookie| serde_json::from_str(cookie.value()).ok())
        .unwrap_or_default()
}

/// Queues a message for the next page the visitor sees.
pub fn push_flash(cookies: &Cookies, level: FlashLevel, message: impl Into<String>) {
    let mut messages = read(cookies);
    messages.push(FlashMessage::new(level, message));

    match serde_json::to_string(&messages) {
        Ok(value) => {
            let mut cookie = Cookie::new(FLASH_COOKIE_NAME, value);
            cookie.set_path("/");
            cookie.set_http_only(true);
            cookies.add(cookie);
        }
        Err(err) => tracing::warn!(error = %err, "dropping flash message"),
    }
}

/// Returns pending messages and clears them.
pub fn take_flash(cookies: &Cookies) -> Vec<FlashMessage> {
    let messages = read(cookies);
    if cookies.get(FLASH_COOKIE_NAME).is_some() {
        let mut removal = Cookie::new(FLASH_COOKIE_NAME, "");
        removal.set_path("/");
        cookies.remove(removal);
    }
    messages
}
