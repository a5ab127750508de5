use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Missing required fields (to, template_id)")]
    MissingRecipient,

    #[error("Invalid template_id: {0}")]
    UnknownTemplate(String),

    #[error("Missing required fields for template {template_id}: {}", .fields.join(", "))]
    MissingFields {
        template_id: String,
        fields: Vec<&'static str>,
    },

    #[error("Server configuration error")]
    NotConfigured,

    #[error("template rendering failed: {0}")]
    Render(#[from] minijinja::Error),

    #[error("email provider error: {0}")]
    Provider(String),

    #[error("email provider unreachable: {0}")]
    Http(#[from] reqwest::Error),
}

impl MailError {
    /// The caller sent a bad payload (400).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingRecipient | Self::MissingFields { .. })
    }

    /// The provider refused or could not be reached (502).
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Http(_))
    }
}
