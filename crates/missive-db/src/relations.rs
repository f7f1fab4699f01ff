use missive_types::models::{NotificationKind, RequestKind, RequestStatus};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::error::on_conflict;
use crate::models::{FriendRequestRow, GroupRow, GroupView, InvitationRow, NotificationRow, UserRef};
use crate::queries::{is_member, query_group_messages, user_exists, user_ref_from_row};
use crate::{Database, DbError, Result};

/// Messages shown on the group chat page.
pub const GROUP_PAGE_MESSAGES: u32 = 50;

const NOTIFICATION_LIMIT: u32 = 50;

const GROUP_COLUMNS: &str = "g.id, g.name, g.description, g.created_by, u.username, g.created_at";

impl Database {
    // -- Groups --

    /// Create a group owned by `creator_id`, who becomes its first member.
    pub fn create_group(&self, name: &str, description: Option<&str>, creator_id: i64) -> Result<i64> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO chat_groups (name, description, created_by) VALUES (?1, ?2, ?3)",
                params![name, description, creator_id],
            )?;
            let group_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)",
                params![group_id, creator_id],
            )?;
            info!("Group {} '{}' created by {}", group_id, name, creator_id);
            Ok(group_id)
        })
    }

    pub fn join_group(&self, group_id: i64, user_id: i64) -> Result<()> {
        self.with_tx(|tx| {
            if !group_exists(tx, group_id)? {
                return Err(DbError::GroupNotFound);
            }
            tx.execute(
                "INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)",
                params![group_id, user_id],
            )
            .map_err(|e| on_conflict(e, DbError::AlreadyMember))?;
            Ok(())
        })
    }

    /// Groups `user_id` belongs to.
    pub fn user_groups(&self, user_id: i64) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {GROUP_COLUMNS}, 1
                 FROM chat_groups g
                 JOIN users u ON g.created_by = u.id
                 JOIN group_members gm ON g.id = gm.group_id
                 WHERE gm.user_id = ?1
                 ORDER BY g.name"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], group_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every group, flagged with whether `user_id` is a member.
    pub fn all_groups(&self, user_id: i64) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {GROUP_COLUMNS},
                        EXISTS(SELECT 1 FROM group_members WHERE group_id = g.id AND user_id = ?1)
                 FROM chat_groups g
                 JOIN users u ON g.created_by = u.id
                 ORDER BY g.name"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], group_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Group info, members and latest messages. Guard: the viewer must be a
    /// member.
    pub fn group_view(&self, group_id: i64, viewer_id: i64) -> Result<GroupView> {
        self.with_conn(|conn| {
            if !is_member(conn, group_id, viewer_id)? {
                return Err(DbError::NotMember);
            }

            let sql = format!(
                "SELECT {GROUP_COLUMNS}, 1
                 FROM chat_groups g
                 JOIN users u ON g.created_by = u.id
                 WHERE g.id = ?1"
            );
            let group = conn
                .query_row(&sql, [group_id], group_from_row)
                .optional()?
                .ok_or(DbError::GroupNotFound)?;

            let mut stmt = conn.prepare(
                "SELECT u.id, u.username
                 FROM group_members gm
                 JOIN users u ON gm.user_id = u.id
                 WHERE gm.group_id = ?1
                 ORDER BY gm.joined_at, u.id",
            )?;
            let members = stmt
                .query_map([group_id], user_ref_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let messages = query_group_messages(conn, group_id, GROUP_PAGE_MESSAGES)?;

            Ok(GroupView { group, members, messages })
        })
    }

    // -- Friend requests --

    /// Create a pending friend request and notify the receiver.
    pub fn send_friend_request(&self, sender_id: i64, sender_name: &str, receiver_id: i64) -> Result<i64> {
        if sender_id == receiver_id {
            return Err(DbError::SelfRequest);
        }

        self.with_tx(|tx| {
            if !user_exists(tx, receiver_id)? {
                return Err(DbError::UserNotFound);
            }

            let pending = tx
                .query_row(
                    "SELECT 1 FROM friend_requests
                     WHERE sender_id = ?1 AND receiver_id = ?2 AND status = 'pending'",
                    params![sender_id, receiver_id],
                    |_| Ok(()),
                )
                .optional()?;
            if pending.is_some() {
                return Err(DbError::DuplicateFriendRequest);
            }

            tx.execute(
                "INSERT INTO friend_requests (sender_id, receiver_id) VALUES (?1, ?2)",
                params![sender_id, receiver_id],
            )
            .map_err(|e| on_conflict(e, DbError::DuplicateFriendRequest))?;
            let request_id = tx.last_insert_rowid();

            insert_notification(
                tx,
                receiver_id,
                &format!("{sender_name} wants to add you as a friend"),
                NotificationKind::FriendRequest,
                request_id,
            )?;

            debug!("Friend request {} from {} to {}", request_id, sender_id, receiver_id);
            Ok(request_id)
        })
    }

    /// Incoming pending friend requests.
    pub fn pending_friend_requests(&self, user_id: i64) -> Result<Vec<FriendRequestRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT fr.id, fr.sender_id, u.username, fr.receiver_id, fr.status, fr.created_at
                 FROM friend_requests fr
                 JOIN users u ON fr.sender_id = u.id
                 WHERE fr.receiver_id = ?1 AND fr.status = 'pending'
                 ORDER BY fr.created_at DESC, fr.id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(FriendRequestRow {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        sender_name: row.get(2)?,
                        receiver_id: row.get(3)?,
                        status: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Users linked to `user_id` by an accepted friend request in either
    /// direction.
    pub fn friends(&self, user_id: i64) -> Result<Vec<UserRef>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT u.id, u.username
                 FROM friend_requests fr
                 JOIN users u
                   ON u.id = CASE WHEN fr.sender_id = ?1 THEN fr.receiver_id ELSE fr.sender_id END
                 WHERE (fr.sender_id = ?1 OR fr.receiver_id = ?1) AND fr.status = 'accepted'
                 ORDER BY u.username",
            )?;
            let rows = stmt
                .query_map([user_id], user_ref_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Group invitations --

    /// Invite `receiver_id` into a group and notify them. Guards: the sender
    /// is a member, the receiver exists and is not yet a member, and no
    /// invitation for the receiver is pending.
    pub fn invite_to_group(
        &self,
        group_id: i64,
        sender_id: i64,
        sender_name: &str,
        receiver_id: i64,
    ) -> Result<i64> {
        self.with_tx(|tx| {
            if !is_member(tx, group_id, sender_id)? {
                return Err(DbError::NotMember);
            }
            if !user_exists(tx, receiver_id)? {
                return Err(DbError::UserNotFound);
            }
            if is_member(tx, group_id, receiver_id)? {
                return Err(DbError::AlreadyMember);
            }

            let pending = tx
                .query_row(
                    "SELECT 1 FROM group_invitations
                     WHERE group_id = ?1 AND receiver_id = ?2 AND status = 'pending'",
                    params![group_id, receiver_id],
                    |_| Ok(()),
                )
                .optional()?;
            if pending.is_some() {
                return Err(DbError::DuplicateInvitation);
            }

            tx.execute(
                "INSERT INTO group_invitations (group_id, sender_id, receiver_id) VALUES (?1, ?2, ?3)",
                params![group_id, sender_id, receiver_id],
            )
            .map_err(|e| on_conflict(e, DbError::DuplicateInvitation))?;
            let invitation_id = tx.last_insert_rowid();

            let group_name: String =
                tx.query_row("SELECT name FROM chat_groups WHERE id = ?1", [group_id], |r| r.get(0))?;

            insert_notification(
                tx,
                receiver_id,
                &format!("{sender_name} invites you to the group '{group_name}'"),
                NotificationKind::GroupInvite,
                invitation_id,
            )?;

            debug!("Invitation {} to group {} for {}", invitation_id, group_id, receiver_id);
            Ok(invitation_id)
        })
    }

    /// Incoming pending group invitations.
    pub fn pending_invitations(&self, user_id: i64) -> Result<Vec<InvitationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT gi.id, gi.group_id, g.name, gi.sender_id, u.username, gi.receiver_id,
                        gi.status, gi.created_at
                 FROM group_invitations gi
                 JOIN chat_groups g ON gi.group_id = g.id
                 JOIN users u ON gi.sender_id = u.id
                 WHERE gi.receiver_id = ?1 AND gi.status = 'pending'
                 ORDER BY gi.created_at DESC, gi.id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(InvitationRow {
                        id: row.get(0)?,
                        group_id: row.get(1)?,
                        group_name: row.get(2)?,
                        sender_id: row.get(3)?,
                        sender_name: row.get(4)?,
                        receiver_id: row.get(5)?,
                        status: row.get(6)?,
                        created_at: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Accept / reject --

    /// Move a pending request addressed to `receiver_id` into `decision`.
    /// Accepting a group invitation also adds the receiver to the group.
    ///
    /// Only pending rows transition, so a repeated accept fails with
    /// `RequestNotFound` instead of adding a second membership. Returns the
    /// group joined, if any.
    pub fn respond_to_request(
        &self,
        kind: RequestKind,
        request_id: i64,
        receiver_id: i64,
        decision: RequestStatus,
    ) -> Result<Option<i64>> {
        if !decision.is_decision() {
            return Err(DbError::RequestNotFound);
        }

        let table = match kind {
            RequestKind::Friend => "friend_requests",
            RequestKind::Group => "group_invitations",
        };

        self.with_tx(|tx| {
            let changed = tx.execute(
                &format!(
                    "UPDATE {table} SET status = ?1
                     WHERE id = ?2 AND receiver_id = ?3 AND status = 'pending'"
                ),
                params![decision.as_str(), request_id, receiver_id],
            )?;
            if changed == 0 {
                return Err(DbError::RequestNotFound);
            }

            if kind == RequestKind::Group && decision == RequestStatus::Accepted {
                let group_id: i64 = tx.query_row(
                    "SELECT group_id FROM group_invitations WHERE id = ?1",
                    [request_id],
                    |r| r.get(0),
                )?;
                // The receiver may have joined on their own since the invite.
                tx.execute(
                    "INSERT OR IGNORE INTO group_members (group_id, user_id) VALUES (?1, ?2)",
                    params![group_id, receiver_id],
                )?;
                info!("User {} joined group {} by invitation {}", receiver_id, group_id, request_id);
                return Ok(Some(group_id));
            }

            Ok(None)
        })
    }

    // -- Notifications --

    pub fn notifications(&self, user_id: i64) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, content, notification_type, related_id, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![user_id, NOTIFICATION_LIMIT], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        content: row.get(2)?,
                        notification_type: row.get(3)?,
                        related_id: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn insert_notification(
    conn: &Connection,
    user_id: i64,
    content: &str,
    kind: NotificationKind,
    related_id: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO notifications (user_id, content, notification_type, related_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![user_id, content, kind.as_str(), related_id],
    )?;
    Ok(())
}

fn group_exists(conn: &Connection, group_id: i64) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM chat_groups WHERE id = ?1", [group_id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_by: row.get(3)?,
        creator_name: row.get(4)?,
        created_at: row.get(5)?,
        is_member: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::is_unique_violation;

    fn setup() -> (Database, i64, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user("alice", "alice@example.com", "hash").unwrap();
        let bob = db.create_user("bob", "bob@example.com", "hash").unwrap();
        let carol = db.create_user("carol", "carol@example.com", "hash").unwrap();
        (db, alice, bob, carol)
    }

    fn memberships(db: &Database, group_id: i64, user_id: i64) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM group_members WHERE group_id = ?1 AND user_id = ?2",
                params![group_id, user_id],
                |r| r.get(0),
            )?)
        })
        .unwrap()
    }

    #[test]
    fn creator_is_first_member() {
        let (db, alice, bob, _) = setup();
        let group = db.create_group("book club", Some("monthly"), alice).unwrap();

        assert!(db.is_member(group, alice).unwrap());
        assert!(!db.is_member(group, bob).unwrap());

        let view = db.group_view(group, alice).unwrap();
        assert_eq!(view.group.creator_name, "alice");
        assert_eq!(view.group.description.as_deref(), Some("monthly"));
        assert_eq!(view.members, vec![UserRef { id: alice, username: "alice".into() }]);
    }

    #[test]
    fn group_view_requires_membership() {
        let (db, alice, bob, _) = setup();
        let group = db.create_group("private", None, alice).unwrap();
        assert!(matches!(db.group_view(group, bob), Err(DbError::NotMember)));
    }

    #[test]
    fn join_group_guards() {
        let (db, alice, bob, _) = setup();
        let group = db.create_group("open", None, alice).unwrap();

        assert!(matches!(db.join_group(group + 1, bob), Err(DbError::GroupNotFound)));
        db.join_group(group, bob).unwrap();
        assert!(matches!(db.join_group(group, bob), Err(DbError::AlreadyMember)));
        assert_eq!(memberships(&db, group, bob), 1);
    }

    #[test]
    fn all_groups_flags_membership() {
        let (db, alice, bob, _) = setup();
        let a = db.create_group("a", None, alice).unwrap();
        let b = db.create_group("b", None, bob).unwrap();

        let all = db.all_groups(alice).unwrap();
        let flags: Vec<_> = all.iter().map(|g| (g.id, g.is_member)).collect();
        assert_eq!(flags, [(a, true), (b, false)]);

        let mine = db.user_groups(alice).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, a);
    }

    #[test]
    fn one_pending_friend_request_per_pair() {
        let (db, alice, bob, _) = setup();
        let request = db.send_friend_request(alice, "alice", bob).unwrap();
        assert!(matches!(
            db.send_friend_request(alice, "alice", bob),
            Err(DbError::DuplicateFriendRequest)
        ));

        let incoming = db.pending_friend_requests(bob).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].id, request);
        assert_eq!(incoming[0].sender_name, "alice");

        let notes = db.notifications(bob).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].notification_type, "friend_request");
        assert_eq!(notes[0].related_id, Some(request));
        assert_eq!(notes[0].content, "alice wants to add you as a friend");

        // Once handled, a new request may be sent.
        db.respond_to_request(RequestKind::Friend, request, bob, RequestStatus::Rejected)
            .unwrap();
        db.send_friend_request(alice, "alice", bob).unwrap();
    }

    #[test]
    fn friend_request_guards() {
        let (db, alice, _, _) = setup();
        assert!(matches!(db.send_friend_request(alice, "alice", alice), Err(DbError::SelfRequest)));
        assert!(matches!(db.send_friend_request(alice, "alice", 999), Err(DbError::UserNotFound)));
    }

    #[test]
    fn accepted_friend_requests_make_friends() {
        let (db, alice, bob, carol) = setup();
        let r1 = db.send_friend_request(alice, "alice", bob).unwrap();
        let r2 = db.send_friend_request(carol, "carol", alice).unwrap();
        db.respond_to_request(RequestKind::Friend, r1, bob, RequestStatus::Accepted).unwrap();
        db.respond_to_request(RequestKind::Friend, r2, alice, RequestStatus::Rejected).unwrap();

        let names: Vec<_> = db.friends(alice).unwrap().into_iter().map(|u| u.username).collect();
        assert_eq!(names, ["bob"]);
        assert_eq!(db.friends(bob).unwrap().len(), 1);
    }

    #[test]
    fn only_the_receiver_can_respond() {
        let (db, alice, bob, carol) = setup();
        let request = db.send_friend_request(alice, "alice", bob).unwrap();
        let result = db.respond_to_request(RequestKind::Friend, request, carol, RequestStatus::Accepted);
        assert!(matches!(result, Err(DbError::RequestNotFound)));
        assert_eq!(db.pending_friend_requests(bob).unwrap().len(), 1);
    }

    #[test]
    fn invitation_requires_sender_membership() {
        let (db, alice, bob, carol) = setup();
        let group = db.create_group("club", None, alice).unwrap();
        let result = db.invite_to_group(group, bob, "bob", carol);
        assert!(matches!(result, Err(DbError::NotMember)));
        assert!(db.pending_invitations(carol).unwrap().is_empty());
    }

    #[test]
    fn invitation_guards() {
        let (db, alice, bob, _) = setup();
        let group = db.create_group("club", None, alice).unwrap();

        assert!(matches!(db.invite_to_group(group, alice, "alice", 999), Err(DbError::UserNotFound)));
        assert!(matches!(db.invite_to_group(group, alice, "alice", alice), Err(DbError::AlreadyMember)));

        db.invite_to_group(group, alice, "alice", bob).unwrap();
        assert!(matches!(
            db.invite_to_group(group, alice, "alice", bob),
            Err(DbError::DuplicateInvitation)
        ));

        let notes = db.notifications(bob).unwrap();
        assert_eq!(notes[0].content, "alice invites you to the group 'club'");
        assert_eq!(notes[0].notification_type, "group_invite");
    }

    #[test]
    fn accepting_invitation_adds_exactly_one_membership() {
        let (db, alice, bob, _) = setup();
        let group = db.create_group("club", None, alice).unwrap();
        let invitation = db.invite_to_group(group, alice, "alice", bob).unwrap();

        let joined = db
            .respond_to_request(RequestKind::Group, invitation, bob, RequestStatus::Accepted)
            .unwrap();
        assert_eq!(joined, Some(group));
        assert_eq!(memberships(&db, group, bob), 1);

        let again = db.respond_to_request(RequestKind::Group, invitation, bob, RequestStatus::Accepted);
        assert!(matches!(again, Err(DbError::RequestNotFound)));
        assert_eq!(memberships(&db, group, bob), 1);
    }

    #[test]
    fn accepting_after_joining_directly_keeps_one_membership() {
        let (db, alice, bob, _) = setup();
        let group = db.create_group("club", None, alice).unwrap();
        let invitation = db.invite_to_group(group, alice, "alice", bob).unwrap();
        db.join_group(group, bob).unwrap();

        db.respond_to_request(RequestKind::Group, invitation, bob, RequestStatus::Accepted)
            .unwrap();
        assert_eq!(memberships(&db, group, bob), 1);
    }

    #[test]
    fn rejecting_invitation_adds_no_membership() {
        let (db, alice, bob, _) = setup();
        let group = db.create_group("club", None, alice).unwrap();
        let invitation = db.invite_to_group(group, alice, "alice", bob).unwrap();

        let joined = db
            .respond_to_request(RequestKind::Group, invitation, bob, RequestStatus::Rejected)
            .unwrap();
        assert_eq!(joined, None);
        assert!(!db.is_member(group, bob).unwrap());
        assert!(db.pending_invitations(bob).unwrap().is_empty());
    }

    #[test]
    fn pending_is_not_a_valid_response() {
        let (db, alice, bob, _) = setup();
        let request = db.send_friend_request(alice, "alice", bob).unwrap();
        let result = db.respond_to_request(RequestKind::Friend, request, bob, RequestStatus::Pending);
        assert!(matches!(result, Err(DbError::RequestNotFound)));
    }

    // Statements that bypass the store's guards, so the schema alone decides.
    fn raw_insert(db: &Database, sql: &str, values: &[i64]) -> rusqlite::Result<usize> {
        db.with_conn(|conn| Ok(conn.execute(sql, rusqlite::params_from_iter(values))))
            .unwrap()
    }

    const RAW_FRIEND_REQUEST: &str =
        "INSERT INTO friend_requests (sender_id, receiver_id) VALUES (?1, ?2)";
    const RAW_INVITATION: &str =
        "INSERT INTO group_invitations (group_id, sender_id, receiver_id) VALUES (?1, ?2, ?3)";

    #[test]
    fn second_pending_friend_request_hits_unique_index() {
        let (db, alice, bob, _) = setup();
        raw_insert(&db, RAW_FRIEND_REQUEST, &[alice, bob]).unwrap();

        let err = raw_insert(&db, RAW_FRIEND_REQUEST, &[alice, bob]).unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(matches!(
            on_conflict(err, DbError::DuplicateFriendRequest),
            DbError::DuplicateFriendRequest
        ));

        // Only pending rows are constrained.
        db.with_conn(|conn| {
            conn.execute("UPDATE friend_requests SET status = 'rejected'", [])?;
            Ok(())
        })
        .unwrap();
        raw_insert(&db, RAW_FRIEND_REQUEST, &[alice, bob]).unwrap();
    }

    #[test]
    fn second_pending_invitation_hits_unique_index() {
        let (db, alice, bob, carol) = setup();
        let group = db.create_group("club", None, alice).unwrap();
        db.join_group(group, carol).unwrap();
        raw_insert(&db, RAW_INVITATION, &[group, alice, bob]).unwrap();

        let err = raw_insert(&db, RAW_INVITATION, &[group, carol, bob]).unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(matches!(
            on_conflict(err, DbError::DuplicateInvitation),
            DbError::DuplicateInvitation
        ));
    }

    #[test]
    fn duplicate_membership_hits_primary_key() {
        let (db, alice, _, _) = setup();
        let group = db.create_group("club", None, alice).unwrap();

        let err = raw_insert(
            &db,
            "INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)",
            &[group, alice],
        )
        .unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(matches!(on_conflict(err, DbError::AlreadyMember), DbError::AlreadyMember));
        assert_eq!(memberships(&db, group, alice), 1);
    }

    #[test]
    fn foreign_key_failure_stays_internal() {
        let (db, alice, _, _) = setup();

        let err = raw_insert(&db, RAW_FRIEND_REQUEST, &[alice, alice + 100]).unwrap_err();
        assert!(!is_unique_violation(&err));
        let mapped = on_conflict(err, DbError::DuplicateFriendRequest);
        assert!(matches!(mapped, DbError::Sqlite(_)));
        assert!(mapped.is_internal());
    }
}
