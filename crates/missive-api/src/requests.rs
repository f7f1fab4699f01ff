//! Friend requests, group invitations and the notifications page where
//! both are answered.

use axum::{
    extract::{Path, State},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;
use tracing::info;

use missive_types::models::{RequestKind, RequestStatus};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::flash::{self, Level};
use crate::middleware::CurrentUser;
use crate::pages::render_page;

pub async fn send_friend_request(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path(receiver_id): Path<i64>,
) -> Response {
    let (sender_id, sender_name) = (user.id, user.username.clone());
    match state
        .db_call(move |db| db.send_friend_request(sender_id, &sender_name, receiver_id))
        .await
    {
        Ok(request_id) => {
            info!("Friend request {} from {} to {}", request_id, user.username, receiver_id);
            flash::redirect(jar, Level::Success, "Friend request sent", "/contacts")
        }
        Err(e) => flash::redirect_error(jar, e, "/contacts"),
    }
}

pub async fn invite_to_group(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path((group_id, receiver_id)): Path<(i64, i64)>,
) -> Response {
    let back = format!("/group_chat/{group_id}");
    let (sender_id, sender_name) = (user.id, user.username.clone());
    match state
        .db_call(move |db| db.invite_to_group(group_id, sender_id, &sender_name, receiver_id))
        .await
    {
        Ok(invitation_id) => {
            info!(
                "Invitation {} to group {} from {} for {}",
                invitation_id, group_id, user.username, receiver_id
            );
            flash::redirect(jar, Level::Success, "Invitation sent", &back)
        }
        Err(e) => flash::redirect_error(jar, e, &back),
    }
}

pub async fn handle_request(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
    Path((kind, request_id, action)): Path<(String, i64, String)>,
) -> Response {
    let parsed = parse_response(&kind, &action);
    let (kind, decision) = match parsed {
        Ok(pair) => pair,
        Err(e) => return flash::redirect_error(jar, e, "/notifications"),
    };

    let receiver_id = user.id;
    match state
        .db_call(move |db| db.respond_to_request(kind, request_id, receiver_id, decision))
        .await
    {
        Ok(joined) => {
            info!("User {} {} {} request {}", user.username, decision, kind, request_id);
            if let Some(group_id) = joined {
                info!("User {} is now a member of group {}", user.username, group_id);
            }
            flash::redirect(jar, Level::Success, format!("Request {decision}"), "/notifications")
        }
        Err(e) => flash::redirect_error(jar, e, "/notifications"),
    }
}

fn parse_response(kind: &str, action: &str) -> Result<(RequestKind, RequestStatus), ApiError> {
    let kind: RequestKind = kind.parse()?;
    let decision: RequestStatus = action.parse()?;
    if !decision.is_decision() {
        return Err(ApiError::BadRequest(format!("'{action}' is not a valid response")));
    }
    Ok((kind, decision))
}

pub async fn notifications(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<Response, ApiError> {
    let user_id = user.id;
    let (notifications, friend_requests, invitations) = state
        .db_call(move |db| {
            Ok((
                db.notifications(user_id)?,
                db.pending_friend_requests(user_id)?,
                db.pending_invitations(user_id)?,
            ))
        })
        .await?;

    render_page(
        &state,
        jar,
        Some(&user),
        "notifications.html",
        context! {
            notifications => notifications,
            friend_requests => friend_requests,
            invitations => invitations,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_accept_or_reject_are_responses() {
        assert_eq!(
            parse_response("group", "accepted").unwrap(),
            (RequestKind::Group, RequestStatus::Accepted)
        );
        assert!(parse_response("friend", "pending").is_err());
        assert!(parse_response("friend", "maybe").is_err());
        assert!(parse_response("channel", "accepted").is_err());
    }
}
