use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, warn};

use missive_db::models::{DirectMessageRow, GroupMessageRow};
use missive_types::api::{ChatMessage, SendMessageRequest, StatusResponse};
use missive_types::models::ChatKind;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// Messages returned per conversation.
pub const HISTORY_LIMIT: u32 = 100;

const INCOMPLETE: &str = "Incomplete data";

pub async fn get_chat_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let Path((chat_type, chat_id)) = path.map_err(|e| {
        debug!("Unreadable chat path: {}", e);
        ApiError::BadRequest("Invalid chat".into())
    })?;
    let kind: ChatKind = chat_type.parse()?;
    let user_id = user.id;

    let messages: Vec<ChatMessage> = match kind {
        ChatKind::User => state
            .db_call(move |db| db.direct_messages(user_id, chat_id, HISTORY_LIMIT))
            .await?
            .into_iter()
            .map(direct_to_wire)
            .collect(),
        ChatKind::Group => state
            .db_call(move |db| db.group_messages_for(chat_id, user_id, HISTORY_LIMIT))
            .await?
            .into_iter()
            .map(group_to_wire)
            .collect(),
    };

    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        debug!("Unreadable send_message body: {}", e);
        ApiError::BadRequest(INCOMPLETE.into())
    })?;

    let message = req.message.as_deref().unwrap_or_default().trim().to_string();
    let (Some(chat_type), Some(chat_id)) = (req.chat_type, req.chat_id) else {
        return Err(ApiError::BadRequest(INCOMPLETE.into()));
    };
    if chat_type.is_empty() || message.is_empty() {
        return Err(ApiError::BadRequest(INCOMPLETE.into()));
    }

    let kind: ChatKind = chat_type.parse()?;
    let sender_id = user.id;

    let message_id = match kind {
        ChatKind::User => {
            state
                .db_call(move |db| db.send_direct_message(sender_id, chat_id, &message))
                .await?
        }
        ChatKind::Group => {
            state
                .db_call(move |db| db.send_group_message(chat_id, sender_id, &message))
                .await?
        }
    };
    debug!("Stored {} message {} from {}", kind, message_id, user.username);

    Ok(Json(StatusResponse::success()))
}

fn direct_to_wire(row: DirectMessageRow) -> ChatMessage {
    ChatMessage {
        timestamp: parse_timestamp(&row.timestamp, row.id),
        id: row.id,
        sender_id: row.sender_id,
        receiver_id: Some(row.receiver_id),
        group_id: None,
        message: row.message,
        sender_name: row.sender_name,
    }
}

fn group_to_wire(row: GroupMessageRow) -> ChatMessage {
    ChatMessage {
        timestamp: parse_timestamp(&row.timestamp, row.id),
        id: row.id,
        sender_id: row.sender_id,
        receiver_id: None,
        group_id: Some(row.group_id),
        message: row.message,
        sender_name: row.sender_name,
    }
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" in UTC without a zone.
fn parse_timestamp(raw: &str, message_id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on message {}: {}", raw, message_id, e);
            DateTime::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_timestamps() {
        let ts = parse_timestamp("2024-03-05 07:08:09", 1);
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 5));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (7, 8, 9));
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday", 1), DateTime::<Utc>::default());
    }
}
