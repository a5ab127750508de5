//! Row mapping between SQLite columns and nguma-types models.
//!
//! Ids are stored as TEXT uuids and timestamps as RFC 3339 strings with
//! microsecond precision, so lexical order equals chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use nguma_types::models::{
    ChatMessage, Conversation, ConversationStatus, KnowledgeDocument, Notification,
    NotificationPriority, QueueStatus, QueuedEmail, UserProfile,
};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

/// Per-conversation support metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatAnalytics {
    pub conversation_id: String,
    pub ai_answered: bool,
    pub escalated_to_admin: bool,
    pub first_response_time_seconds: Option<i64>,
}

pub fn now_ts() -> String {
    format_ts(Utc::now())
}

pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_err<E>(idx: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

fn invalid_value(idx: usize, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unexpected value '{}'", value).into(),
    )
}

pub(crate) fn uuid_at(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s).map_err(|e| conversion_err(idx, e))
}

pub(crate) fn ts_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

pub(crate) fn opt_ts_at(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| conversion_err(idx, e))
    })
    .transpose()
}

pub(crate) const CONVERSATION_COLUMNS: &str = "id, user_id, title, subject, status, last_message_at, \
     user_unread_count, admin_unread_count, created_at, updated_at";

pub(crate) fn conversation_from_row(row: &Row) -> rusqlite::Result<Conversation> {
    let status: String = row.get(4)?;
    Ok(Conversation {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        title: row.get(2)?,
        subject: row.get(3)?,
        status: ConversationStatus::parse(&status).ok_or_else(|| invalid_value(4, &status))?,
        last_message_at: opt_ts_at(row, 5)?,
        user_unread_count: row.get(6)?,
        admin_unread_count: row.get(7)?,
        created_at: ts_at(row, 8)?,
        updated_at: ts_at(row, 9)?,
    })
}

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender_id, message, is_admin, created_at, read_at";

pub(crate) fn message_from_row(row: &Row) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: uuid_at(row, 0)?,
        conversation_id: uuid_at(row, 1)?,
        sender_id: uuid_at(row, 2)?,
        message: row.get(3)?,
        is_admin: row.get(4)?,
        created_at: ts_at(row, 5)?,
        read_at: opt_ts_at(row, 6)?,
    })
}

pub(crate) const NOTIFICATION_COLUMNS: &str =
    "id, user_id, type, priority, message, link_to, is_read, created_at";

pub(crate) fn notification_from_row(row: &Row) -> rusqlite::Result<Notification> {
    let priority: String = row.get(3)?;
    Ok(Notification {
        id: uuid_at(row, 0)?,
        user_id: uuid_at(row, 1)?,
        kind: row.get(2)?,
        priority: NotificationPriority::parse(&priority)
            .ok_or_else(|| invalid_value(3, &priority))?,
        message: row.get(4)?,
        link_to: row.get(5)?,
        is_read: row.get(6)?,
        created_at: ts_at(row, 7)?,
    })
}

pub(crate) const PROFILE_COLUMNS: &str = "id, email, first_name, last_name, subscription_tier, \
     total_invested, risk_profile, investment_goals";

pub(crate) fn profile_from_row(row: &Row) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: uuid_at(row, 0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        subscription_tier: row.get(4)?,
        total_invested: row.get(5)?,
        risk_profile: row.get(6)?,
        investment_goals: row.get(7)?,
    })
}

pub(crate) const DOCUMENT_COLUMNS: &str =
    "id, title, content, category, is_active, embedding IS NOT NULL, created_at";

pub(crate) fn document_from_row(row: &Row) -> rusqlite::Result<KnowledgeDocument> {
    Ok(KnowledgeDocument {
        id: uuid_at(row, 0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        category: row.get(3)?,
        is_active: row.get(4)?,
        has_embedding: row.get(5)?,
        created_at: ts_at(row, 6)?,
    })
}

pub(crate) const QUEUE_COLUMNS: &str = "id, template_id, recipient_email, notification_params, \
     status, last_error, retry_attempts, created_at";

pub(crate) fn queued_email_from_row(row: &Row) -> rusqlite::Result<QueuedEmail> {
    let params: String = row.get(3)?;
    let status: String = row.get(4)?;
    Ok(QueuedEmail {
        id: uuid_at(row, 0)?,
        template_id: row.get(1)?,
        recipient_email: row.get(2)?,
        notification_params: serde_json::from_str(&params).map_err(|e| conversion_err(3, e))?,
        status: QueueStatus::parse(&status).ok_or_else(|| invalid_value(4, &status))?,
        last_error: row.get(5)?,
        retry_attempts: row.get(6)?,
        created_at: ts_at(row, 7)?,
    })
}
