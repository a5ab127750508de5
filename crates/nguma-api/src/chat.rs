use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};

use nguma_assistant::{AssistantError, AssistantReply};
use nguma_gateway::dispatcher::Dispatcher;
use nguma_types::api::{ChatAiRequest, Claims};

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /functions/v1/chat-ai`
pub async fn chat_ai(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<ChatAiRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) =
        payload.map_err(|_| ApiError::BadRequest(AssistantError::EmptyMessage.to_string()))?;

    let reply = state
        .responder
        .respond(claims.sub, req.conversation_id, &req.message)
        .await?;
    publish_reply(&state.dispatcher, &reply);

    Ok(Json(reply.response))
}

/// Push the stored assistant message, the touched conversation and any
/// escalation notifications to realtime subscribers.
pub(crate) fn publish_reply(dispatcher: &Dispatcher, reply: &AssistantReply) {
    dispatcher.message_created(&reply.message);
    if let Some(conversation) = &reply.conversation {
        dispatcher.conversation_updated(conversation);
    }
    dispatcher.notifications_created(&reply.notifications);
}
