use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;
use tracing::{info, warn};

use missive_db::Database;
use missive_types::api::{LoginForm, LoginQuery, RegisterForm};

use crate::error::ApiError;
use crate::flash::{self, Flash, Level};
use crate::middleware::{self, CurrentUser, SessionConfig};
use crate::pages::{Pages, render_page, render_with_flash};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub pages: Pages,
    pub session: SessionConfig,
}

impl AppStateInner {
    /// Run a store operation off the async runtime.
    pub async fn db_call<F, T>(self: &Arc<Self>, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> missive_db::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let state = Arc::clone(self);
        let result = tokio::task::spawn_blocking(move || f(&state.db)).await?;
        result.map_err(ApiError::from)
    }
}

pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    if middleware::resolve(&state, &jar).await?.is_some() {
        return Ok(Redirect::to("/contacts").into_response());
    }
    render_page(&state, jar, None, "index.html", context! {})
}

pub async fn register_page(State(state): State<AppState>, jar: CookieJar) -> Result<Response, ApiError> {
    render_page(&state, jar, None, "register.html", context! {})
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiError> {
    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();

    if let Err(reason) = validate_registration(&username, &email, &form.password) {
        return Ok(flash::redirect(jar, Level::Danger, reason, "/register"));
    }

    let password = form.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

    let name = username.clone();
    match state
        .db_call(move |db| db.create_user(&name, &email, &password_hash))
        .await
    {
        Ok(user_id) => {
            info!("Registered user {} ({})", username, user_id);
            Ok(flash::redirect(
                jar,
                Level::Success,
                "Registration successful! Please log in.",
                "/login",
            ))
        }
        Err(e) => Ok(flash::redirect_error(jar, e, "/register")),
    }
}

pub async fn login_page(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ApiError> {
    render_page(&state, jar, None, "login.html", context! { next => query.next })
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    let next = query.next.or(form.next);
    let username = form.username.trim().to_string();

    let lookup = username.clone();
    let user = state
        .db_call(move |db| db.get_user_by_username(&lookup))
        .await?;

    let user = match user {
        Some(user) => {
            let password = form.password;
            let hash = user.password.clone();
            let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await??;
            valid.then_some(user)
        }
        None => None,
    };

    let Some(user) = user else {
        warn!("Failed login for '{}'", username);
        return render_with_flash(
            &state,
            jar,
            None,
            "login.html",
            context! { next => next },
            Some(Flash::new(Level::Danger, "Invalid username or password")),
        );
    };

    let token = middleware::issue_token(&state.session, user.id, &user.username)?;
    let jar = jar.add(middleware::session_cookie(&state.session, token));
    info!("User {} logged in", user.username);

    Ok((jar, Redirect::to(safe_next(next.as_deref()))).into_response())
}

pub async fn logout(user: CurrentUser, jar: CookieJar) -> Response {
    info!("User {} logged out", user.username);
    let jar = middleware::clear_session(jar);
    flash::redirect(jar, Level::Success, "You have been logged out", "/")
}

fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), &'static str> {
    let name_len = username.chars().count();
    if !(3..=32).contains(&name_len) {
        return Err("Username must be between 3 and 32 characters");
    }
    if !email.contains('@') {
        return Err("Please enter a valid email address");
    }
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Argon2id with a random salt, PHC string output.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hash).map_err(|e| ApiError::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Only same-site paths are followed after login.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.bytes().any(|b| b.is_ascii_control()) =>
        {
            path
        }
        _ => "/contacts",
    }
}
