use axum::{
    Form,
    extract::{Path, State},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;
use tracing::info;

use missive_db::DbError;
use missive_types::api::{CreateGroupForm, GroupMessageForm};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::flash::{self, Level};
use crate::middleware::CurrentUser;
use crate::pages::render_page;

pub async fn groups(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let user_id = user.id;
    let (user_groups, all_groups) = state
        .db_call(move |db| Ok((db.user_groups(user_id)?, db.all_groups(user_id)?)))
        .await?;

    render_page(
        &state,
        jar,
        Some(&user),
        "groups.html",
        context! { user_groups => user_groups, all_groups => all_groups },
    )
}

pub async fn create_group_page(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    render_page(&state, jar, Some(&user), "create_group.html", context! {})
}

pub async fn create_group(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<CreateGroupForm>,
) -> Response {
    let name = form.name.trim().to_string();
    if name.is_empty() {
        return flash::redirect(jar, Level::Danger, "Group name is required", "/create_group");
    }
    let description = Some(form.description.trim().to_string()).filter(|d| !d.is_empty());

    let creator_id = user.id;
    match state
        .db_call(move |db| db.create_group(&name, description.as_deref(), creator_id))
        .await
    {
        Ok(group_id) => flash::redirect(
            jar,
            Level::Success,
            "Group created successfully!",
            &format!("/group_chat/{group_id}"),
        ),
        Err(e) => flash::redirect_error(jar, e, "/create_group"),
    }
}

pub async fn join_group(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(group_id): Path<i64>,
) -> Response {
    let user_id = user.id;
    match state.db_call(move |db| db.join_group(group_id, user_id)).await {
        Ok(()) => {
            info!("User {} joined group {}", user.username, group_id);
            flash::redirect(jar, Level::Success, "You have joined the group!", "/groups")
        }
        Err(e) => flash::redirect_error(jar, e, "/groups"),
    }
}

pub async fn group_chat(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(group_id): Path<i64>,
) -> Result<Response, ApiError> {
    let user_id = user.id;
    let view = match state.db_call(move |db| db.group_view(group_id, user_id)).await {
        Ok(view) => view,
        Err(e) => return Ok(flash::redirect_error(jar, e, "/groups")),
    };

    render_page(
        &state,
        jar,
        Some(&user),
        "group_chat.html",
        context! { group => view.group, members => view.members, messages => view.messages },
    )
}

pub async fn send_group_message(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Form(form): Form<GroupMessageForm>,
) -> Response {
    let message = form.message.trim().to_string();
    if form.group_id.trim().is_empty() || message.is_empty() {
        return flash::redirect(jar, Level::Danger, "Invalid request", "/groups");
    }
    let Ok(group_id) = form.group_id.trim().parse::<i64>() else {
        return flash::redirect(jar, Level::Danger, "Invalid group", "/groups");
    };

    let sender_id = user.id;
    let back = format!("/group_chat/{group_id}");
    match state
        .db_call(move |db| db.send_group_message(group_id, sender_id, &message))
        .await
    {
        Ok(_) => flash::redirect(jar, Level::Success, "Message sent to group!", &back),
        Err(e @ ApiError::Db(DbError::NotMember)) => flash::redirect_error(jar, e, "/groups"),
        Err(e) => flash::redirect_error(jar, e, &back),
    }
}
