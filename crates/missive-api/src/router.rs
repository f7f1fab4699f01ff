use std::path::Path;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::middleware::{require_api_session, require_page_session};
use crate::{contacts, groups, messages, requests, users};

/// Build the full application router. `static_dir` is served under
/// `/static`.
pub fn router(state: AppState, static_dir: &Path) -> Router {
    let public_routes = Router::new()
        .route("/", get(auth::index))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login));

    let page_routes = Router::new()
        .route("/logout", get(auth::logout))
        .route("/contacts", get(contacts::contacts))
        .route("/contacts/{chat_type}/{chat_id}", get(contacts::open_chat))
        .route("/groups", get(groups::groups))
        .route("/create_group", get(groups::create_group_page).post(groups::create_group))
        .route("/join_group/{group_id}", get(groups::join_group))
        .route("/group_chat/{group_id}", get(groups::group_chat))
        .route("/send_group_message", post(groups::send_group_message))
        .route("/send_friend_request/{user_id}", get(requests::send_friend_request))
        .route("/invite_to_group/{group_id}/{user_id}", get(requests::invite_to_group))
        .route("/handle_request/{kind}/{request_id}/{action}", get(requests::handle_request))
        .route("/notifications", get(requests::notifications))
        .route("/profile", get(users::profile))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_page_session));

    let json_routes = Router::new()
        .route("/get_chat_messages/{chat_type}/{chat_id}", get(messages::get_chat_messages))
        .route("/send_message", post(messages::send_message))
        .route("/search_users", get(users::search_users))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_session));

    Router::new()
        .merge(public_routes)
        .merge(page_routes)
        .merge(json_routes)
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
