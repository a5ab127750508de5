use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, warn};
use uuid::Uuid;

use nguma_types::api::{
    Claims, ConversationListQuery, CreateConversationRequest, SendMessageRequest,
};
use nguma_types::models::{Conversation, NewNotification, NotificationPriority};

use crate::chat::publish_reply;
use crate::error::ApiError;
use crate::state::AppState;

/// Load a conversation the caller may read: its owner or any admin.
/// Returns the conversation and whether the caller is an admin.
async fn authorize(
    state: &AppState,
    conversation_id: Uuid,
    claims: &Claims,
) -> Result<(Conversation, bool), ApiError> {
    let user_id = claims.sub;
    let (conversation, is_admin) = state
        .blocking(move |db| Ok((db.get_conversation(conversation_id)?, db.is_admin(user_id)?)))
        .await?;

    let conversation =
        conversation.ok_or_else(|| ApiError::NotFound("Conversation not found.".into()))?;
    if conversation.user_id != user_id && !is_admin {
        return Err(ApiError::Forbidden(
            "User is not the owner of this conversation.".into(),
        ));
    }
    Ok((conversation, is_admin))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let conversations = state
        .blocking(move |db| db.list_user_conversations(user_id))
        .await?;
    Ok(Json(conversations))
}

/// The body is optional; an empty request creates an untitled conversation.
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: CreateConversationRequest = if body.is_empty() {
        CreateConversationRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };

    let user_id = claims.sub;
    let title = req
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let conversation = state
        .blocking(move |db| db.create_conversation(user_id, title.as_deref()))
        .await?;

    state.dispatcher.conversation_updated(&conversation);
    Ok((StatusCode::CREATED, Json(conversation)))
}

pub async fn current_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub;
    let conversation = state
        .blocking(move |db| db.get_or_create_open_conversation(user_id))
        .await?;
    Ok(Json(conversation))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (conversation, _) = authorize(&state, conversation_id, &claims).await?;
    Ok(Json(conversation))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    authorize(&state, conversation_id, &claims).await?;
    let messages = state
        .blocking(move |db| db.list_messages(conversation_id))
        .await?;
    Ok(Json(messages))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let text = req.message.trim().to_string();
    if text.is_empty() {
        return Err(ApiError::BadRequest("Message is required".into()));
    }

    let (conversation, is_admin) = authorize(&state, conversation_id, &claims).await?;
    let sender_id = claims.sub;
    let owner_id = conversation.user_id;
    let fallback_name = claims.email.clone();
    let body = text.clone();

    let (message, conversation, notifications) = state
        .blocking(move |db| {
            let message = db.insert_message(conversation_id, sender_id, &body, is_admin)?;
            // Only the owner's message names the conversation.
            let title = (sender_id == owner_id).then(|| Conversation::title_from_message(&body));
            let conversation =
                db.record_message_activity(conversation_id, is_admin, title.as_deref())?;

            let batch = if is_admin {
                vec![NewNotification {
                    user_id: owner_id,
                    kind: "support".into(),
                    priority: NotificationPriority::High,
                    message: "Nouveau message de support de l'administration".into(),
                    link_to: Some("/support".into()),
                }]
            } else {
                let sender_name = db
                    .get_profile(sender_id)?
                    .and_then(|p| p.display_name())
                    .or(fallback_name)
                    .unwrap_or_else(|| "un utilisateur".into());
                db.admin_ids()?
                    .into_iter()
                    .map(|admin_id| NewNotification {
                        user_id: admin_id,
                        kind: "support".into(),
                        priority: NotificationPriority::Medium,
                        message: format!("Nouveau message de support de {}", sender_name),
                        link_to: Some(format!("/admin/support?conversation={}", conversation_id)),
                    })
                    .collect()
            };
            let notifications = db.insert_notifications(&batch)?;
            Ok((message, conversation, notifications))
        })
        .await?;

    state.dispatcher.message_created(&message);
    if let Some(conversation) = &conversation {
        state.dispatcher.conversation_updated(conversation);
    }
    state.dispatcher.notifications_created(&notifications);

    if !is_admin && state.auto_reply {
        let state = state.clone();
        tokio::spawn(async move {
            match state.responder.respond(owner_id, conversation_id, &text).await {
                Ok(reply) => publish_reply(&state.dispatcher, &reply),
                Err(e) => warn!("Assistant failed on conversation {}: {}", conversation_id, e),
            }
        });
    }

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let (conversation, is_admin) = authorize(&state, conversation_id, &claims).await?;
    // An admin reading their own conversation reads it as its owner.
    let as_admin = is_admin && conversation.user_id != claims.sub;

    let conversation = state
        .blocking(move |db| db.mark_conversation_read(conversation_id, as_admin))
        .await?
        .ok_or_else(|| ApiError::NotFound("Conversation not found.".into()))?;

    state.dispatcher.conversation_updated(&conversation);
    Ok(Json(conversation))
}

pub async fn admin_list_conversations(
    State(state): State<AppState>,
    Query(query): Query<ConversationListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let conversations = state
        .blocking(move |db| db.list_admin_conversations(query.status))
        .await?;
    Ok(Json(conversations))
}

pub async fn close_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let conversation = state
        .blocking(move |db| db.close_conversation(conversation_id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Conversation not found.".into()))?;

    info!("Admin {} closed conversation {}", claims.sub, conversation_id);
    state.dispatcher.conversation_updated(&conversation);
    Ok(Json(conversation))
}
