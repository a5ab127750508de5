use std::sync::Arc;

use secrecy::SecretString;
use tracing::error;

use nguma_assistant::Responder;
use nguma_db::Database;
use nguma_gateway::dispatcher::Dispatcher;
use nguma_mail::Mailer;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

/// Shared secrets accepted from trusted callers (cron jobs, other services).
pub struct ServiceSecrets {
    /// Accepted as `Authorization: Bearer <key>` or in the `apikey` header.
    pub service_key: SecretString,
    /// Accepted in the `X-Internal-Secret` header.
    pub internal_secret: Option<SecretString>,
    pub cron_secret: SecretString,
}

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub dispatcher: Dispatcher,
    pub responder: Arc<Responder>,
    pub mailer: Arc<Mailer>,
    pub jwt_secret: String,
    pub secrets: ServiceSecrets,
    /// Run the assistant in the background after every user message.
    pub auto_reply: bool,
    pub queue_batch_size: usize,
}

impl AppStateInner {
    /// Run a store call on the blocking pool.
    pub async fn blocking<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::internal()
            })?
            .map_err(ApiError::from)
    }
}
