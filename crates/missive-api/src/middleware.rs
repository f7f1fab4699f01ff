use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use tracing::debug;

use missive_types::models::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

pub const SESSION_COOKIE: &str = "missive_session";

/// Session signing and cookie settings, part of the application state.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_days: i64,
    pub secure_cookies: bool,
}

/// The authenticated user, attached to the request by the session
/// middleware and extracted by handlers.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

pub fn issue_token(config: &SessionConfig, user_id: i64, username: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(config.ttl_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn session_cookie(config: &SessionConfig, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(config.secure_cookies)
        .same_site(SameSite::Lax)
        .build()
}

pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

/// Resolve the session cookie to a user. A missing, expired or forged
/// token, or one naming a user that no longer exists, yields `None`.
pub async fn resolve(state: &AppState, jar: &CookieJar) -> Result<Option<CurrentUser>, ApiError> {
    let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
        return Ok(None);
    };

    let claims = match decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.session.secret.as_bytes()),
        &Validation::default(),
    ) {
        Ok(data) => data.claims,
        Err(e) => {
            debug!("Rejected session token: {}", e);
            return Ok(None);
        }
    };

    let Ok(user_id) = claims.sub.parse::<i64>() else {
        debug!("Session token with non-numeric subject '{}'", claims.sub);
        return Ok(None);
    };

    let user = state.db_call(move |db| db.get_user_by_id(user_id)).await?;
    Ok(user.map(|u| CurrentUser {
        id: u.id,
        username: u.username,
        email: u.email,
    }))
}

/// Page routes: unauthenticated visitors go to the login form and come
/// back afterwards.
pub async fn require_page_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match resolve(&state, &jar).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(None) => {
            let target = format!("/login?next={}", encode_query_value(req.uri().path()));
            (clear_session(jar), Redirect::to(&target)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// JSON routes: unauthenticated callers get a 401 payload.
pub async fn require_api_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match resolve(&state, &jar).await {
        Ok(Some(user)) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(None) => ApiError::Unauthorized.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Characters escaped in a `next=` value. Path separators and the
/// unreserved set pass through.
const NEXT_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, NEXT_VALUE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig {
            secret: "test-secret".into(),
            ttl_days: 1,
            secure_cookies: false,
        }
    }

    #[test]
    fn issued_token_decodes_with_same_secret() {
        let token = issue_token(&config(), 42, "alice").unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.sub, "42");
        assert_eq!(data.claims.username, "alice");

        let wrong = decode::<Claims>(&token, &DecodingKey::from_secret(b"other"), &Validation::default());
        assert!(wrong.is_err());
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie(&config(), "token".into());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[test]
    fn next_path_is_percent_encoded() {
        assert_eq!(encode_query_value("/group_chat/3"), "/group_chat/3");
        assert_eq!(encode_query_value("/contacts/a&b/1"), "/contacts/a%26b/1");
        assert_eq!(encode_query_value("/profile?x=1 2"), "/profile%3Fx%3D1%202");
        assert_eq!(encode_query_value("/caf\u{e9}"), "/caf%C3%A9");
    }
}
