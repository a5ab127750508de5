use thiserror::Error;

/// Failures talking to the embedding / generation provider.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("Conversation not found.")]
    ConversationNotFound,

    #[error("User is not the owner of this conversation.")]
    NotOwner,

    #[error("Message and conversationId are required")]
    EmptyMessage,

    #[error("AI provider error: {0}")]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl AssistantError {
    /// Errors caused by the upstream provider rather than by us or the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Model(_))
    }
}
