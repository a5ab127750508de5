use crate::Database;
use crate::models::{
    CONVERSATION_COLUMNS, MESSAGE_COLUMNS, NOTIFICATION_COLUMNS, PROFILE_COLUMNS,
    conversation_from_row, message_from_row, notification_from_row, now_ts, opt_ts_at,
    profile_from_row, ts_at, uuid_at,
};
use anyhow::Result;
use nguma_types::api::AdminConversation;
use nguma_types::models::{
    AI_SENDER_ID, ChatMessage, Conversation, ConversationStatus, DEFAULT_SUBJECT,
    NewNotification, Notification, UserProfile,
};
use rusqlite::Connection;
use uuid::Uuid;

pub const ADMIN_ROLE: &str = "admin";

/// Most notifications returned by one listing, newest first.
pub const NOTIFICATION_LIST_LIMIT: usize = 100;

impl Database {
    // -- Profiles & roles --

    pub fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, email, first_name, last_name, subscription_tier,
                                       total_invested, risk_profile, investment_goals)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    subscription_tier = excluded.subscription_tier,
                    total_invested = excluded.total_invested,
                    risk_profile = excluded.risk_profile,
                    investment_goals = excluded.investment_goals",
                rusqlite::params![
                    profile.id.to_string(),
                    profile.email,
                    profile.first_name,
                    profile.last_name,
                    profile.subscription_tier,
                    profile.total_invested,
                    profile.risk_profile,
                    profile.investment_goals,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_profile(&self, id: Uuid) -> Result<Option<UserProfile>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS),
                [id.to_string()],
                profile_from_row,
            )
            .optional()
        })
    }

    pub fn set_role(&self, user_id: Uuid, role: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO user_roles (user_id, role) VALUES (?1, ?2)",
                (user_id.to_string(), role),
            )?;
            Ok(())
        })
    }

    pub fn is_admin(&self, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM user_roles WHERE user_id = ?1 AND role = ?2",
                    (user_id.to_string(), ADMIN_ROLE),
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Every distinct user holding the admin role.
    pub fn admin_ids(&self) -> Result<Vec<Uuid>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT user_id FROM user_roles WHERE role = ?1 ORDER BY user_id",
            )?;
            let rows = stmt
                .query_map([ADMIN_ROLE], |row| uuid_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Conversations --

    pub fn create_conversation(&self, user_id: Uuid, title: Option<&str>) -> Result<Conversation> {
        self.with_conn(|conn| insert_conversation(conn, user_id, title))
    }

    pub fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>> {
        self.with_conn(|conn| query_conversation(conn, id))
    }

    /// Latest open conversation of the user, creating one when none exists.
    pub fn get_or_create_open_conversation(&self, user_id: Uuid) -> Result<Conversation> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let existing = tx
                .query_row(
                    &format!(
                        "SELECT {} FROM chat_conversations
                         WHERE user_id = ?1 AND status = 'open'
                         ORDER BY COALESCE(last_message_at, created_at) DESC
                         LIMIT 1",
                        CONVERSATION_COLUMNS
                    ),
                    [user_id.to_string()],
                    conversation_from_row,
                )
                .optional()?;

            let conversation = match existing {
                Some(c) => c,
                None => insert_conversation(&tx, user_id, None)?,
            };
            tx.commit()?;
            Ok(conversation)
        })
    }

    /// The user's conversations, most recent activity first.
    pub fn list_user_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM chat_conversations
                 WHERE user_id = ?1
                 ORDER BY COALESCE(last_message_at, created_at) DESC",
                CONVERSATION_COLUMNS
            ))?;
            let rows = stmt
                .query_map([user_id.to_string()], conversation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_admin_conversations(
        &self,
        status: Option<ConversationStatus>,
    ) -> Result<Vec<AdminConversation>> {
        self.with_conn(|conn| {
            // JOIN profiles and pick the newest message in one pass
            let mut stmt = conn.prepare(
                "SELECT c.id, c.user_id, c.title, c.subject, c.status, c.last_message_at,
                        c.admin_unread_count, p.email, p.first_name, p.last_name,
                        (SELECT m.message FROM chat_messages m
                          WHERE m.conversation_id = c.id
                          ORDER BY m.created_at DESC, m.rowid DESC LIMIT 1),
                        c.updated_at
                 FROM chat_conversations c
                 LEFT JOIN profiles p ON p.id = c.user_id
                 WHERE ?1 IS NULL OR c.status = ?1
                 ORDER BY COALESCE(c.last_message_at, c.created_at) DESC",
            )?;

            let rows = stmt
                .query_map([status.map(|s| s.as_str())], |row| {
                    let status: String = row.get(4)?;
                    let email: Option<String> = row.get(7)?;
                    let first: Option<String> = row.get(8)?;
                    let last: Option<String> = row.get(9)?;
                    let user_name = match (first, last) {
                        (Some(f), Some(l)) => Some(format!("{} {}", f, l)),
                        (Some(f), None) => Some(f),
                        (None, Some(l)) => Some(l),
                        (None, None) => None,
                    };
                    Ok(AdminConversation {
                        id: uuid_at(row, 0)?,
                        user_id: uuid_at(row, 1)?,
                        title: row.get(2)?,
                        subject: row.get(3)?,
                        status: ConversationStatus::parse(&status)
                            .unwrap_or(ConversationStatus::Open),
                        last_message_at: opt_ts_at(row, 5)?,
                        admin_unread_count: row.get(6)?,
                        user_email: email,
                        user_name,
                        last_message: row.get(10)?,
                        updated_at: ts_at(row, 11)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Bookkeeping after a human message: reopen, touch, bump the other
    /// side's unread counter and fill in a missing title. Callers pass a
    /// title hint only for the owner's own messages.
    pub fn record_message_activity(
        &self,
        conversation_id: Uuid,
        sender_is_admin: bool,
        title_hint: Option<&str>,
    ) -> Result<Option<Conversation>> {
        self.with_conn(|conn| {
            let now = now_ts();
            let (user_inc, admin_inc) = if sender_is_admin { (1, 0) } else { (0, 1) };
            conn.execute(
                "UPDATE chat_conversations SET
                    last_message_at = ?1,
                    updated_at = ?1,
                    status = 'open',
                    user_unread_count = user_unread_count + ?2,
                    admin_unread_count = admin_unread_count + ?3,
                    title = COALESCE(title, ?4)
                 WHERE id = ?5",
                rusqlite::params![
                    now,
                    user_inc,
                    admin_inc,
                    title_hint,
                    conversation_id.to_string()
                ],
            )?;
            query_conversation(conn, conversation_id)
        })
    }

    /// Stamp last activity without touching counters (assistant replies).
    pub fn touch_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>> {
        self.with_conn(|conn| {
            let now = now_ts();
            conn.execute(
                "UPDATE chat_conversations SET last_message_at = ?1, updated_at = ?1 WHERE id = ?2",
                (now, conversation_id.to_string()),
            )?;
            query_conversation(conn, conversation_id)
        })
    }

    /// Clear the reader's unread counter and stamp `read_at` on messages
    /// written by the other side.
    pub fn mark_conversation_read(
        &self,
        conversation_id: Uuid,
        reader_is_admin: bool,
    ) -> Result<Option<Conversation>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = now_ts();
            let id = conversation_id.to_string();
            let ai = AI_SENDER_ID.to_string();

            if reader_is_admin {
                tx.execute(
                    "UPDATE chat_conversations SET admin_unread_count = 0 WHERE id = ?1",
                    [&id],
                )?;
                tx.execute(
                    "UPDATE chat_messages SET read_at = ?1
                     WHERE conversation_id = ?2 AND read_at IS NULL
                       AND is_admin = 0 AND sender_id != ?3",
                    (&now, &id, &ai),
                )?;
            } else {
                tx.execute(
                    "UPDATE chat_conversations SET user_unread_count = 0 WHERE id = ?1",
                    [&id],
                )?;
                tx.execute(
                    "UPDATE chat_messages SET read_at = ?1
                     WHERE conversation_id = ?2 AND read_at IS NULL
                       AND (is_admin = 1 OR sender_id = ?3)",
                    (&now, &id, &ai),
                )?;
            }

            let conversation = query_conversation(&tx, conversation_id)?;
            tx.commit()?;
            Ok(conversation)
        })
    }

    pub fn close_conversation(&self, conversation_id: Uuid) -> Result<Option<Conversation>> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE chat_conversations SET status = 'closed', updated_at = ?1 WHERE id = ?2",
                (now_ts(), conversation_id.to_string()),
            )?;
            query_conversation(conn, conversation_id)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        message: &str,
        is_admin: bool,
    ) -> Result<ChatMessage> {
        self.with_conn(|conn| {
            let id = Uuid::new_v4();
            conn.execute(
                "INSERT INTO chat_messages (id, conversation_id, sender_id, message, is_admin, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id.to_string(),
                    conversation_id.to_string(),
                    sender_id.to_string(),
                    message,
                    is_admin,
                    now_ts(),
                ],
            )?;
            conn.query_row(
                &format!("SELECT {} FROM chat_messages WHERE id = ?1", MESSAGE_COLUMNS),
                [id.to_string()],
                message_from_row,
            )
            .map_err(Into::into)
        })
    }

    /// All messages of a conversation, oldest first.
    pub fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<ChatMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM chat_messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at ASC, rowid ASC",
                MESSAGE_COLUMNS
            ))?;
            let rows = stmt
                .query_map([conversation_id.to_string()], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The last `limit` messages of a conversation, oldest first.
    pub fn recent_messages(&self, conversation_id: Uuid, limit: usize) -> Result<Vec<ChatMessage>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM chat_messages
                 WHERE conversation_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
                MESSAGE_COLUMNS
            ))?;
            let mut rows = stmt
                .query_map(
                    rusqlite::params![conversation_id.to_string(), limit as i64],
                    message_from_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
    }

    // -- Notifications --

    /// Insert a batch of notifications atomically.
    pub fn insert_notifications(&self, batch: &[NewNotification]) -> Result<Vec<Notification>> {
        if batch.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut created = Vec::with_capacity(batch.len());
            {
                let mut insert = tx.prepare(
                    "INSERT INTO notifications (id, user_id, type, priority, message, link_to, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                let mut select = tx.prepare(&format!(
                    "SELECT {} FROM notifications WHERE id = ?1",
                    NOTIFICATION_COLUMNS
                ))?;
                for n in batch {
                    let id = Uuid::new_v4().to_string();
                    insert.execute(rusqlite::params![
                        id,
                        n.user_id.to_string(),
                        n.kind,
                        n.priority.as_str(),
                        n.message,
                        n.link_to,
                        now_ts(),
                    ])?;
                    created.push(select.query_row([&id], notification_from_row)?);
                }
            }
            tx.commit()?;
            Ok(created)
        })
    }

    pub fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM notifications
                 WHERE user_id = ?1 AND (?2 = 0 OR is_read = 0)
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?3",
                NOTIFICATION_COLUMNS
            ))?;
            let params = rusqlite::params![
                user_id.to_string(),
                unread_only,
                NOTIFICATION_LIST_LIMIT as i64
            ];
            let rows = stmt
                .query_map(params, notification_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when the notification does not exist or belongs to someone else.
    pub fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
                (id.to_string(), user_id.to_string()),
            )?;
            Ok(changed > 0)
        })
    }
}

fn insert_conversation(
    conn: &Connection,
    user_id: Uuid,
    title: Option<&str>,
) -> Result<Conversation> {
    let id = Uuid::new_v4();
    let now = now_ts();
    conn.execute(
        "INSERT INTO chat_conversations (id, user_id, title, subject, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'open', ?5, ?5)",
        rusqlite::params![id.to_string(), user_id.to_string(), title, DEFAULT_SUBJECT, now],
    )?;
    query_conversation(conn, id)?.ok_or_else(|| anyhow::anyhow!("Conversation vanished: {}", id))
}

fn query_conversation(conn: &Connection, id: Uuid) -> Result<Option<Conversation>> {
    conn.query_row(
        &format!("SELECT {} FROM chat_conversations WHERE id = ?1", CONVERSATION_COLUMNS),
        [id.to_string()],
        conversation_from_row,
    )
    .optional()
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nguma_types::models::NotificationPriority;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn get_or_create_reuses_open_conversation() {
        let db = db();
        let user = Uuid::new_v4();

        let first = db.get_or_create_open_conversation(user).unwrap();
        let again = db.get_or_create_open_conversation(user).unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(first.subject, DEFAULT_SUBJECT);
        assert_eq!(first.status, ConversationStatus::Open);

        db.close_conversation(first.id).unwrap();
        let fresh = db.get_or_create_open_conversation(user).unwrap();
        assert_ne!(fresh.id, first.id);
    }

    #[test]
    fn message_activity_bumps_other_side() {
        let db = db();
        let user = Uuid::new_v4();
        let conv = db.create_conversation(user, None).unwrap();

        let after_user = db
            .record_message_activity(conv.id, false, Some("Bonjour"))
            .unwrap()
            .unwrap();
        assert_eq!(after_user.admin_unread_count, 1);
        assert_eq!(after_user.user_unread_count, 0);
        assert_eq!(after_user.title.as_deref(), Some("Bonjour"));
        assert!(after_user.last_message_at.is_some());

        let after_admin = db
            .record_message_activity(conv.id, true, Some("ignored"))
            .unwrap()
            .unwrap();
        assert_eq!(after_admin.user_unread_count, 1);
        assert_eq!(after_admin.title.as_deref(), Some("Bonjour"));
    }

    #[test]
    fn activity_reopens_closed_conversation() {
        let db = db();
        let conv = db.create_conversation(Uuid::new_v4(), Some("t")).unwrap();
        db.close_conversation(conv.id).unwrap();
        let reopened = db.record_message_activity(conv.id, false, None).unwrap().unwrap();
        assert_eq!(reopened.status, ConversationStatus::Open);
    }

    #[test]
    fn recent_messages_are_chronological_tail() {
        let db = db();
        let user = Uuid::new_v4();
        let conv = db.create_conversation(user, None).unwrap();
        for i in 0..8 {
            db.insert_message(conv.id, user, &format!("m{}", i), false).unwrap();
        }

        let recent = db.recent_messages(conv.id, 6).unwrap();
        let texts: Vec<_> = recent.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["m2", "m3", "m4", "m5", "m6", "m7"]);
        assert_eq!(db.list_messages(conv.id).unwrap().len(), 8);
    }

    #[test]
    fn mark_read_stamps_other_side_only() {
        let db = db();
        let user = Uuid::new_v4();
        let admin = Uuid::new_v4();
        let conv = db.create_conversation(user, None).unwrap();
        db.insert_message(conv.id, user, "question", false).unwrap();
        db.insert_message(conv.id, AI_SENDER_ID, "réponse", false).unwrap();
        db.insert_message(conv.id, admin, "suivi", true).unwrap();
        db.record_message_activity(conv.id, true, None).unwrap();

        let conv = db.mark_conversation_read(conv.id, false).unwrap().unwrap();
        assert_eq!(conv.user_unread_count, 0);

        let messages = db.list_messages(conv.id).unwrap();
        assert!(messages[0].read_at.is_none());
        assert!(messages[1].read_at.is_some());
        assert!(messages[2].read_at.is_some());
    }

    #[test]
    fn admin_ids_are_distinct() {
        let db = db();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        db.set_role(a, ADMIN_ROLE).unwrap();
        db.set_role(a, ADMIN_ROLE).unwrap();
        db.set_role(a, "moderator").unwrap();
        db.set_role(b, ADMIN_ROLE).unwrap();
        db.set_role(Uuid::new_v4(), "user").unwrap();

        let ids = db.admin_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(db.is_admin(a).unwrap());
        assert!(!db.is_admin(Uuid::new_v4()).unwrap());
    }

    #[test]
    fn notifications_round_trip_and_ownership() {
        let db = db();
        let user = Uuid::new_v4();
        let created = db
            .insert_notifications(&[NewNotification {
                user_id: user,
                kind: "support".into(),
                priority: NotificationPriority::High,
                message: "Nouveau message".into(),
                link_to: Some("/support".into()),
            }])
            .unwrap();
        assert_eq!(created.len(), 1);

        let id = created[0].id;
        assert!(!db.mark_notification_read(id, Uuid::new_v4()).unwrap());
        assert!(db.mark_notification_read(id, user).unwrap());
        assert!(db.list_notifications(user, true).unwrap().is_empty());
        assert_eq!(db.list_notifications(user, false).unwrap().len(), 1);
    }

    #[test]
    fn notification_listing_is_capped_newest_first() {
        let db = db();
        let user = Uuid::new_v4();
        let batch: Vec<_> = (0..=NOTIFICATION_LIST_LIMIT)
            .map(|i| NewNotification {
                user_id: user,
                kind: "support".into(),
                priority: NotificationPriority::Low,
                message: format!("n{}", i),
                link_to: None,
            })
            .collect();
        db.insert_notifications(&batch).unwrap();

        let listed = db.list_notifications(user, false).unwrap();
        assert_eq!(listed.len(), NOTIFICATION_LIST_LIMIT);
        assert_eq!(listed[0].message, format!("n{}", NOTIFICATION_LIST_LIMIT));
        assert!(listed.iter().all(|n| n.message != "n0"));
    }

    #[test]
    fn admin_listing_includes_profile_and_preview() {
        let db = db();
        let user = Uuid::new_v4();
        db.upsert_profile(&UserProfile {
            id: user,
            email: Some("awa@example.com".into()),
            first_name: Some("Awa".into()),
            last_name: Some("Mbuyi".into()),
            ..Default::default()
        })
        .unwrap();
        let conv = db.create_conversation(user, None).unwrap();
        db.insert_message(conv.id, user, "premier", false).unwrap();
        db.insert_message(conv.id, user, "dernier", false).unwrap();
        db.close_conversation(conv.id).unwrap();

        let all = db.list_admin_conversations(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].user_name.as_deref(), Some("Awa Mbuyi"));
        assert_eq!(all[0].last_message.as_deref(), Some("dernier"));

        assert!(db.list_admin_conversations(Some(ConversationStatus::Open)).unwrap().is_empty());
    }
}
