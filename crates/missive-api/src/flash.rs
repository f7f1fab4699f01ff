//! One-shot status messages carried to the next rendered page in a cookie.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::ApiError;

pub const FLASH_COOKIE: &str = "missive_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

impl Flash {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self { level, message: message.into() }
    }

    fn encode(&self) -> String {
        // Serializing two plain fields cannot fail.
        B64.encode(serde_json::to_vec(self).unwrap_or_default())
    }

    fn decode(value: &str) -> Option<Self> {
        let bytes = B64.decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

/// Attach a flash message to the outgoing response.
pub fn push(jar: CookieJar, level: Level, message: impl Into<String>) -> CookieJar {
    let value = Flash::new(level, message).encode();
    jar.add(
        Cookie::build((FLASH_COOKIE, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

/// Read and clear the pending flash message, if any.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let Some(cookie) = jar.get(FLASH_COOKIE) else {
        return (jar, None);
    };
    let flash = Flash::decode(cookie.value());
    if flash.is_none() {
        debug!("Discarding malformed flash cookie");
    }
    (jar.remove(Cookie::build(FLASH_COOKIE).path("/")), flash)
}

pub fn redirect(jar: CookieJar, level: Level, message: impl Into<String>, to: &str) -> Response {
    (push(jar, level, message), Redirect::to(to)).into_response()
}

/// Report a failed action to the user and send them to `to`. Internal
/// errors are logged and shown generically.
pub fn redirect_error(jar: CookieJar, err: ApiError, to: &str) -> Response {
    if err.is_internal() {
        error!("{}", err);
    } else {
        debug!("Action refused: {}", err);
    }
    redirect(jar, err.flash_level(), err.user_message(), to)
}
