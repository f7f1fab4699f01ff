use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::error::on_conflict;
use crate::models::{ChatEntry, DirectMessageRow, GroupMessageRow, UserRef, UserRow};
use crate::{Database, DbError, Result};

/// Cap on `search_users` hits.
pub const SEARCH_LIMIT: u32 = 10;

impl Database {
    // -- Users --

    /// Insert a new user. Fails with `UserExists` when the username or the
    /// email is taken; the check and the insert share one transaction.
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<i64> {
        self.with_tx(|tx| {
            let taken = tx
                .query_row(
                    "SELECT 1 FROM users WHERE username = ?1 OR email = ?2",
                    params![username, email],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if taken {
                return Err(DbError::UserExists);
            }

            tx.execute(
                "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
                params![username, email, password_hash],
            )
            .map_err(|e| on_conflict(e, DbError::UserExists))?;

            Ok(tx.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, email, password, created_at FROM users WHERE username = ?1",
                [username],
                user_from_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, email, password, created_at FROM users WHERE id = ?1",
                [id],
                user_from_row,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// Usernames containing `query` (case-insensitive for ASCII), excluding
    /// the caller, at most `SEARCH_LIMIT` of them. `%` and `_` in the query
    /// match literally.
    pub fn search_users(&self, user_id: i64, query: &str) -> Result<Vec<UserRef>> {
        let pattern = format!("%{}%", escape_like(query));
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username FROM users
                 WHERE username LIKE ?1 ESCAPE '\\' AND id != ?2
                 ORDER BY username
                 LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(params![pattern, user_id, SEARCH_LIMIT], user_ref_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Contacts --

    /// Every other user plus the groups `user_id` belongs to.
    pub fn list_chats(&self, user_id: i64) -> Result<Vec<ChatEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, username AS name, 'user' AS type FROM users WHERE id != ?1
                 UNION ALL
                 SELECT g.id, g.name, 'group' AS type FROM chat_groups g
                 JOIN group_members gm ON g.id = gm.group_id
                 WHERE gm.user_id = ?1
                 ORDER BY type DESC, name",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ChatEntry {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        kind: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Direct messages --

    /// Guard: the receiver must exist.
    pub fn send_direct_message(&self, sender_id: i64, receiver_id: i64, message: &str) -> Result<i64> {
        self.with_tx(|tx| {
            if !user_exists(tx, receiver_id)? {
                return Err(DbError::UserNotFound);
            }
            tx.execute(
                "INSERT INTO messages (sender_id, receiver_id, message) VALUES (?1, ?2, ?3)",
                params![sender_id, receiver_id, message],
            )?;
            let id = tx.last_insert_rowid();
            debug!("Direct message {} from {} to {}", id, sender_id, receiver_id);
            Ok(id)
        })
    }

    /// Conversation between two users in both directions, newest first.
    pub fn direct_messages(&self, user_id: i64, other_id: i64, limit: u32) -> Result<Vec<DirectMessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.sender_id, m.receiver_id, m.message, m.timestamp, u.username
                 FROM messages m
                 JOIN users u ON m.sender_id = u.id
                 WHERE (m.sender_id = ?1 AND m.receiver_id = ?2)
                    OR (m.sender_id = ?2 AND m.receiver_id = ?1)
                 ORDER BY m.timestamp DESC, m.id DESC
                 LIMIT ?3",
            )?;
            let rows = stmt
                .query_map(params![user_id, other_id, limit], |row| {
                    Ok(DirectMessageRow {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        receiver_id: row.get(2)?,
                        message: row.get(3)?,
                        timestamp: row.get(4)?,
                        sender_name: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Group messages --

    /// Guard: the sender must be a member of the group.
    pub fn send_group_message(&self, group_id: i64, sender_id: i64, message: &str) -> Result<i64> {
        self.with_tx(|tx| {
            if !is_member(tx, group_id, sender_id)? {
                return Err(DbError::NotMember);
            }
            tx.execute(
                "INSERT INTO group_messages (group_id, sender_id, message) VALUES (?1, ?2, ?3)",
                params![group_id, sender_id, message],
            )?;
            Ok(tx.last_insert_rowid())
        })
    }

    /// Latest messages of a group, newest first. Guard: the reader must be
    /// a member.
    pub fn group_messages_for(&self, group_id: i64, reader_id: i64, limit: u32) -> Result<Vec<GroupMessageRow>> {
        self.with_conn(|conn| {
            if !is_member(conn, group_id, reader_id)? {
                return Err(DbError::NotMember);
            }
            query_group_messages(conn, group_id, limit)
        })
    }

    pub fn is_member(&self, group_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| is_member(conn, group_id, user_id))
    }
}

pub(crate) fn query_group_messages(conn: &Connection, group_id: i64, limit: u32) -> Result<Vec<GroupMessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT gm.id, gm.group_id, gm.sender_id, gm.message, gm.timestamp, u.username
         FROM group_messages gm
         JOIN users u ON gm.sender_id = u.id
         WHERE gm.group_id = ?1
         ORDER BY gm.timestamp DESC, gm.id DESC
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![group_id, limit], |row| {
            Ok(GroupMessageRow {
                id: row.get(0)?,
                group_id: row.get(1)?,
                sender_id: row.get(2)?,
                message: row.get(3)?,
                timestamp: row.get(4)?,
                sender_name: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn is_member(conn: &Connection, group_id: i64, user_id: i64) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM group_members WHERE group_id = ?1 AND user_id = ?2",
            params![group_id, user_id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn user_exists(conn: &Connection, user_id: i64) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [user_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn user_ref_from_row(row: &Row<'_>) -> rusqlite::Result<UserRef> {
    Ok(UserRef {
        id: row.get(0)?,
        username: row.get(1)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn escape_like(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db_with_users(names: &[&str]) -> (Database, Vec<i64>) {
        let db = Database::open_in_memory().unwrap();
        let ids = names
            .iter()
            .map(|n| db.create_user(n, &format!("{n}@example.com"), "hash").unwrap())
            .collect();
        (db, ids)
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?)
        })
        .unwrap()
    }

    #[test]
    fn duplicate_username_or_email_is_rejected() {
        let (db, _) = db_with_users(&["alice"]);

        let by_name = db.create_user("alice", "other@example.com", "hash");
        assert!(matches!(by_name, Err(DbError::UserExists)));

        let by_email = db.create_user("alicia", "alice@example.com", "hash");
        assert!(matches!(by_email, Err(DbError::UserExists)));

        assert_eq!(count(&db, "users"), 1);
    }

    #[test]
    fn looks_up_users() {
        let (db, ids) = db_with_users(&["alice"]);
        let by_name = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, ids[0]);
        assert_eq!(by_name.email, "alice@example.com");
        assert!(db.get_user_by_id(ids[0] + 100).unwrap().is_none());
    }

    #[test]
    fn direct_message_to_missing_user_writes_nothing() {
        let (db, ids) = db_with_users(&["alice"]);
        let result = db.send_direct_message(ids[0], 999, "hello?");
        assert!(matches!(result, Err(DbError::UserNotFound)));
        assert_eq!(count(&db, "messages"), 0);
    }

    #[test]
    fn conversation_includes_both_directions_newest_first() {
        let (db, ids) = db_with_users(&["alice", "bob", "carol"]);
        let (alice, bob, carol) = (ids[0], ids[1], ids[2]);
        db.send_direct_message(alice, bob, "hi bob").unwrap();
        db.send_direct_message(bob, alice, "hi alice").unwrap();
        db.send_direct_message(carol, alice, "unrelated").unwrap();

        let messages = db.direct_messages(alice, bob, 100).unwrap();
        let texts: Vec<_> = messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, ["hi alice", "hi bob"]);
        assert_eq!(messages[0].sender_name, "bob");

        assert_eq!(db.direct_messages(alice, bob, 1).unwrap().len(), 1);
    }

    #[test]
    fn group_message_requires_membership() {
        let (db, ids) = db_with_users(&["alice", "bob"]);
        let group = db.create_group("rustaceans", None, ids[0]).unwrap();

        let result = db.send_group_message(group, ids[1], "let me in");
        assert!(matches!(result, Err(DbError::NotMember)));
        assert_eq!(count(&db, "group_messages"), 0);

        db.send_group_message(group, ids[0], "welcome").unwrap();
        let read = db.group_messages_for(group, ids[0], 100).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].sender_name, "alice");

        assert!(matches!(
            db.group_messages_for(group, ids[1], 100),
            Err(DbError::NotMember)
        ));
    }

    #[test]
    fn search_matches_substring_excludes_caller_and_caps() {
        let mut names = vec!["alice", "malik", "bob", "kali"];
        let extra: Vec<String> = (0..12).map(|i| format!("ali{i:02}")).collect();
        names.extend(extra.iter().map(String::as_str));
        let (db, ids) = db_with_users(&names);

        let hits = db.search_users(ids[0], "ali").unwrap();
        assert_eq!(hits.len(), SEARCH_LIMIT as usize);
        assert!(hits.iter().all(|u| u.username.contains("ali")));
        assert!(hits.iter().all(|u| u.id != ids[0]));

        let few = db.search_users(ids[0], "mal").unwrap();
        assert_eq!(few, vec![UserRef { id: ids[1], username: "malik".into() }]);
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let (db, ids) = db_with_users(&["alice", "bob"]);
        assert!(db.search_users(ids[0], "%").unwrap().is_empty());
        assert!(db.search_users(ids[0], "_").unwrap().is_empty());
    }

    #[test]
    fn chats_list_other_users_and_own_groups() {
        let (db, ids) = db_with_users(&["alice", "bob"]);
        let mine = db.create_group("mine", None, ids[0]).unwrap();
        db.create_group("theirs", None, ids[1]).unwrap();

        let chats = db.list_chats(ids[0]).unwrap();
        let summary: Vec<_> = chats.iter().map(|c| (c.kind.as_str(), c.id)).collect();
        assert_eq!(summary, [("user", ids[1]), ("group", mine)]);
    }
}
