use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

/// Store failures. Everything except `Sqlite` and `LockPoisoned` is a guard
/// failure: the operation was refused and nothing was written.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Username or email already exists")]
    UserExists,

    #[error("User not found")]
    UserNotFound,

    #[error("Group not found")]
    GroupNotFound,

    #[error("You are not a member of this group")]
    NotMember,

    #[error("User is already a member of this group")]
    AlreadyMember,

    #[error("Friend request already sent")]
    DuplicateFriendRequest,

    #[error("Invitation already sent")]
    DuplicateInvitation,

    #[error("You cannot send a request to yourself")]
    SelfRequest,

    #[error("Request not found or already handled")]
    RequestNotFound,

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl DbError {
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Sqlite(_) | Self::LockPoisoned)
    }

    /// Text safe to show to the user. Internal failures are not described.
    pub fn user_message(&self) -> String {
        if self.is_internal() {
            "Something went wrong, please try again".to_string()
        } else {
            self.to_string()
        }
    }
}

/// True when `err` is a UNIQUE or PRIMARY KEY violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && matches!(
                    e.extended_code,
                    rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                )
        }
        _ => false,
    }
}

/// Map a unique violation to the guard error `conflict`, anything else to
/// an internal error.
pub(crate) fn on_conflict(err: rusqlite::Error, conflict: DbError) -> DbError {
    if is_unique_violation(&err) {
        conflict
    } else {
        DbError::Sqlite(err)
    }
}
