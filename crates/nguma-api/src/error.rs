use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use nguma_assistant::AssistantError;
use nguma_mail::MailError;
use nguma_types::api::ErrorResponse;

/// Every handler error, rendered as `{ "error": "<message>" }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// The email or AI provider failed.
    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized".into())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden("Forbidden".into())
    }

    pub fn internal() -> Self {
        Self::Internal("Internal server error".into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

/// Store failures are logged here and never leak their details.
impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!("Store error: {:#}", e);
        Self::internal()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<AssistantError> for ApiError {
    fn from(e: AssistantError) -> Self {
        match e {
            AssistantError::ConversationNotFound => Self::NotFound(e.to_string()),
            AssistantError::NotOwner => Self::Forbidden(e.to_string()),
            AssistantError::EmptyMessage => Self::BadRequest(e.to_string()),
            AssistantError::Model(_) => {
                warn!("AI provider failure: {}", e);
                Self::Upstream(e.to_string())
            }
            AssistantError::Store(inner) => inner.into(),
        }
    }
}

impl From<MailError> for ApiError {
    fn from(e: MailError) -> Self {
        match e {
            MailError::UnknownTemplate(_) => Self::NotFound(e.to_string()),
            _ if e.is_validation() => Self::BadRequest(e.to_string()),
            _ if e.is_upstream() => {
                warn!("Email provider failure: {}", e);
                Self::Upstream(e.to_string())
            }
            MailError::NotConfigured => Self::Internal(e.to_string()),
            _ => {
                error!("Email rendering failed: {}", e);
                Self::internal()
            }
        }
    }
}
