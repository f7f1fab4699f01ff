use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use missive_db::DbError;
use missive_types::api::StatusResponse;
use missive_types::models::UnknownVariant;

use crate::flash::Level;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Authentication required")]
    Unauthorized,

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<UnknownVariant> for ApiError {
    fn from(err: UnknownVariant) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Db(e) => match e {
                DbError::UserExists
                | DbError::AlreadyMember
                | DbError::DuplicateFriendRequest
                | DbError::DuplicateInvitation => StatusCode::CONFLICT,
                DbError::UserNotFound | DbError::GroupNotFound | DbError::RequestNotFound => {
                    StatusCode::NOT_FOUND
                }
                DbError::NotMember => StatusCode::FORBIDDEN,
                DbError::SelfRequest => StatusCode::BAD_REQUEST,
                DbError::Sqlite(_) | DbError::LockPoisoned => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Template(_) | Self::Token(_) | Self::PasswordHash(_) | Self::Join(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }

    /// Message shown to the user. Internal failures are logged, not shown.
    pub fn user_message(&self) -> String {
        match self {
            Self::Db(e) => e.user_message(),
            _ if self.is_internal() => "Something went wrong, please try again".to_string(),
            _ => self.to_string(),
        }
    }

    /// Conflicts read as warnings, everything else as errors.
    pub fn flash_level(&self) -> Level {
        if self.status() == StatusCode::CONFLICT {
            Level::Warning
        } else {
            Level::Danger
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.is_internal() {
            error!("{}", self);
        }
        let status = self.status();
        (status, Json(StatusResponse::error(self.user_message()))).into_response()
    }
}
