use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS profiles (
            id                  TEXT PRIMARY KEY,
            email               TEXT,
            first_name          TEXT,
            last_name           TEXT,
            subscription_tier   TEXT,
            total_invested      REAL,
            risk_profile        TEXT,
            investment_goals    TEXT
        );

        CREATE TABLE IF NOT EXISTS user_roles (
            user_id     TEXT NOT NULL,
            role        TEXT NOT NULL,
            PRIMARY KEY (user_id, role)
        );

        CREATE TABLE IF NOT EXISTS chat_conversations (
            id                  TEXT PRIMARY KEY,
            user_id             TEXT NOT NULL,
            title               TEXT,
            subject             TEXT NOT NULL,
            status              TEXT NOT NULL DEFAULT 'open',
            last_message_at     TEXT,
            user_unread_count   INTEGER NOT NULL DEFAULT 0,
            admin_unread_count  INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_user
            ON chat_conversations(user_id, status);

        CREATE TABLE IF NOT EXISTS chat_messages (
            id              TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL REFERENCES chat_conversations(id),
            sender_id       TEXT NOT NULL,
            message         TEXT NOT NULL,
            is_admin        INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL,
            read_at         TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON chat_messages(conversation_id, created_at);

        CREATE TABLE IF NOT EXISTS notifications (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            type        TEXT NOT NULL,
            priority    TEXT NOT NULL DEFAULT 'medium',
            message     TEXT NOT NULL,
            link_to     TEXT,
            is_read     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);

        CREATE TABLE IF NOT EXISTS knowledge_base (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            content     TEXT NOT NULL,
            category    TEXT,
            is_active   INTEGER NOT NULL DEFAULT 1,
            embedding   BLOB,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chat_analytics (
            conversation_id             TEXT PRIMARY KEY,
            ai_answered                 INTEGER NOT NULL DEFAULT 0,
            escalated_to_admin          INTEGER NOT NULL DEFAULT 0,
            first_response_time_seconds INTEGER,
            updated_at                  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS notifications_queue (
            id                  TEXT PRIMARY KEY,
            template_id         TEXT NOT NULL,
            recipient_email     TEXT NOT NULL,
            notification_params TEXT NOT NULL DEFAULT '{}',
            status              TEXT NOT NULL DEFAULT 'pending',
            last_error          TEXT,
            retry_attempts      INTEGER NOT NULL DEFAULT 0,
            created_at          TEXT NOT NULL,
            processed_at        TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_queue_status
            ON notifications_queue(status, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
