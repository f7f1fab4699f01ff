use axum::{
    Json,
    extract::{Query, State},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;

use missive_types::api::{SearchQuery, UserSummary};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::pages::render_page;

pub async fn search_users(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let user_id = user.id;
    let hits = state
        .db_call(move |db| db.search_users(user_id, query.q.trim()))
        .await?;

    Ok(Json(
        hits.into_iter()
            .map(|u| UserSummary { id: u.id, username: u.username })
            .collect(),
    ))
}

pub async fn profile(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let user_id = user.id;
    let (profile, friends) = state
        .db_call(move |db| Ok((db.get_user_by_id(user_id)?, db.friends(user_id)?)))
        .await?;
    let profile = profile.ok_or(ApiError::Unauthorized)?;

    render_page(
        &state,
        jar,
        Some(&user),
        "profile.html",
        context! { user => profile, friends => friends },
    )
}
