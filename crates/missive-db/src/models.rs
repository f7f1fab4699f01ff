//! Database row types. They map directly to SQLite rows and serialize
//! straight into page templates; JSON wire types live in missive-types.
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    pub created_at: String,
}

/// Minimal user reference for member lists, search hits and friends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
}

/// One entry of the contacts sidebar: either another user or a group the
/// viewer belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct ChatEntry {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectMessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub message: String,
    pub timestamp: String,
    pub sender_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupMessageRow {
    pub id: i64,
    pub group_id: i64,
    pub sender_id: i64,
    pub message: String,
    pub timestamp: String,
    pub sender_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_by: i64,
    pub creator_name: String,
    pub created_at: String,
    pub is_member: bool,
}

/// Everything the group chat page shows, read under one lock.
#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    pub group: GroupRow,
    pub members: Vec<UserRef>,
    pub messages: Vec<GroupMessageRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FriendRequestRow {
    pub id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub receiver_id: i64,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvitationRow {
    pub id: i64,
    pub group_id: i64,
    pub group_name: String,
    pub sender_id: i64,
    pub sender_name: String,
    pub receiver_id: i64,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationRow {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub notification_type: String,
    pub related_id: Option<i64>,
    pub created_at: String,
}
