use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ConversationStatus, KnowledgeMatch};

// -- JWT Claims --

/// Platform access-token claims, shared by nguma-api (REST middleware) and
/// nguma-gateway (WebSocket authentication).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    pub exp: usize,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Chat AI --

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatAiRequest {
    pub conversation_id: Uuid,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatAiResponse {
    pub should_escalate: bool,
    pub reply: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub is_truncated: Option<bool>,
}

// -- Conversations --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversationListQuery {
    #[serde(default)]
    pub status: Option<ConversationStatus>,
}

/// Admin view of a conversation with the owner's identity and the latest message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConversation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub subject: String,
    pub status: ConversationStatus,
    pub last_message_at: Option<DateTime<Utc>>,
    pub admin_unread_count: u32,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub last_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// -- Notifications --

#[derive(Debug, Default, Deserialize)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread_only: bool,
}

// -- Knowledge base --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateKnowledgeRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub embedding: Vec<f32>,
    pub success: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BackfillResponse {
    pub processed: usize,
    pub failed: usize,
    pub remaining: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub matches: Vec<KnowledgeMatch>,
}

// -- Email --

#[derive(Debug, Serialize, Deserialize)]
pub struct SendEmailResponse {
    pub success: bool,
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnqueueEmailRequest {
    pub template_id: String,
    pub recipient_email: String,
    #[serde(default)]
    pub notification_params: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnqueueEmailResponse {
    pub id: Uuid,
}

/// Body of the notification forwarder: the notification row as written.
#[derive(Debug, Deserialize)]
pub struct NotificationEmailRequest {
    pub record: NotificationRecord,
}

#[derive(Debug, Deserialize)]
pub struct NotificationRecord {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub message: String,
    #[serde(default)]
    pub link_to: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEmailResponse {
    pub message: String,
    pub resend_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct QueueRunResponse {
    pub processed: usize,
    pub sent: usize,
    pub failed: usize,
}
