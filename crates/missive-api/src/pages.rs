use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use minijinja::{Environment, Value, context};
use serde::Serialize;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::flash::{self, Flash};
use crate::middleware::CurrentUser;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("register.html", include_str!("../templates/register.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("contacts.html", include_str!("../templates/contacts.html")),
    ("groups.html", include_str!("../templates/groups.html")),
    ("create_group.html", include_str!("../templates/create_group.html")),
    ("group_chat.html", include_str!("../templates/group_chat.html")),
    ("notifications.html", include_str!("../templates/notifications.html")),
    ("profile.html", include_str!("../templates/profile.html")),
];

/// Server-side templates, compiled once at startup.
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<Html<String>, ApiError> {
        let html = self.env.get_template(name)?.render(ctx)?;
        Ok(Html(html))
    }
}

/// Render a page, consuming any pending flash message.
pub fn render_page(
    state: &AppState,
    jar: CookieJar,
    user: Option<&CurrentUser>,
    name: &str,
    ctx: Value,
) -> Result<Response, ApiError> {
    render_with_flash(state, jar, user, name, ctx, None)
}

/// Like `render_page`, but shows `flash` in place of the stored message.
pub fn render_with_flash(
    state: &AppState,
    jar: CookieJar,
    user: Option<&CurrentUser>,
    name: &str,
    ctx: Value,
    flash: Option<Flash>,
) -> Result<Response, ApiError> {
    let (jar, stored) = flash::take(jar);
    let flash = flash.or(stored);
    let html = state.pages.render(
        name,
        context! {
            current_user => user,
            flash => flash,
            ..ctx
        },
    )?;
    Ok((jar, html).into_response())
}
