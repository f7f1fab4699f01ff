use axum::{
    extract::{Path, State},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;
use serde::Serialize;

use missive_types::models::ChatKind;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::flash::{self, Level};
use crate::middleware::CurrentUser;
use crate::pages::render_page;

/// Chat opened on page load when following a deep link.
#[derive(Debug, Serialize)]
struct InitialChat {
    #[serde(rename = "type")]
    kind: ChatKind,
    id: i64,
}

pub async fn contacts(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    show(state, user, jar, None).await
}

pub async fn open_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path((chat_type, chat_id)): Path<(String, i64)>,
) -> Result<Response, ApiError> {
    match chat_type.parse::<ChatKind>() {
        Ok(kind) => show(state, user, jar, Some(InitialChat { kind, id: chat_id })).await,
        Err(e) => Ok(flash::redirect(jar, Level::Warning, e.to_string(), "/contacts")),
    }
}

async fn show(
    state: AppState,
    user: CurrentUser,
    jar: CookieJar,
    initial_chat: Option<InitialChat>,
) -> Result<Response, ApiError> {
    let user_id = user.id;
    let chats = state.db_call(move |db| db.list_chats(user_id)).await?;

    render_page(
        &state,
        jar,
        Some(&user),
        "contacts.html",
        context! { chats => chats, initial_chat => initial_chat },
    )
}
