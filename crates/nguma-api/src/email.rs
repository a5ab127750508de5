use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use serde_json::{Map, Value};
use tracing::{debug, info};

use nguma_mail::NotificationEmail;
use nguma_types::api::{NotificationEmailRequest, NotificationEmailResponse, SendEmailResponse};

use crate::error::ApiError;
use crate::middleware::Caller;
use crate::state::AppState;

/// `POST /functions/v1/send-resend-email`
///
/// The body carries `template_id`, `to` and the template's fields at the
/// top level.
pub async fn send_resend_email(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;

    if let Caller::User(claims) = &caller {
        debug!("User {} requested a template email", claims.sub);
    }

    let sent = state.mailer.send(payload).await?;
    Ok(Json(SendEmailResponse {
        success: true,
        id: Some(sent.id),
    }))
}

/// `POST /functions/v1/send-email-notification`
///
/// Forwards a notification row to the profile email of its recipient.
pub async fn send_notification_email(
    State(state): State<AppState>,
    payload: Result<Json<NotificationEmailRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(NotificationEmailRequest { record }) = payload?;
    let user_id = record.user_id;

    let email = state
        .blocking(move |db| db.get_profile(user_id))
        .await?
        .and_then(|profile| profile.email)
        .filter(|email| !email.trim().is_empty())
        .ok_or_else(|| ApiError::NotFound(format!("Email not found for user {}", user_id)))?;

    let notification = NotificationEmail {
        message: record.message,
        link_to: record.link_to,
        kind: record.kind,
        priority: record.priority,
    };
    let sent = state.mailer.send_notification(&email, &notification).await?;
    if let Some(id) = record.id {
        info!("Forwarded notification {} to user {}", id, user_id);
    }

    Ok(Json(NotificationEmailResponse {
        message: "Email sent successfully".into(),
        resend_id: sent.id,
    }))
}
