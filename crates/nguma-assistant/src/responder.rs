use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use nguma_db::Database;
use nguma_db::knowledge::AnalyticsUpdate;
use nguma_types::api::ChatAiResponse;
use nguma_types::models::{
    AI_SENDER_ID, ChatMessage, Conversation, NewNotification, Notification, NotificationPriority,
};

use crate::config::AssistantConfig;
use crate::error::AssistantError;
use crate::model::{GenerationRequest, LanguageModel};
use crate::phrases::{self, ESCALATION_REPLY, TRUNCATION_NOTICE};
use crate::prompt::{PromptContext, render_support_prompt};

/// What one responder run produced. The stored rows are returned so the
/// caller can push them to realtime subscribers.
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub response: ChatAiResponse,
    pub message: ChatMessage,
    pub conversation: Option<Conversation>,
    pub notifications: Vec<Notification>,
}

pub struct Responder {
    db: Arc<Database>,
    model: Arc<dyn LanguageModel>,
    config: AssistantConfig,
}

impl Responder {
    pub fn new(db: Arc<Database>, model: Arc<dyn LanguageModel>, config: AssistantConfig) -> Self {
        Self { db, model, config }
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    /// Run the decision procedure for the latest user message of a conversation.
    pub async fn respond(
        &self,
        user_id: Uuid,
        conversation_id: Uuid,
        message: &str,
    ) -> Result<AssistantReply, AssistantError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AssistantError::EmptyMessage);
        }

        let conversation = self
            .blocking(move |db| db.get_conversation(conversation_id))
            .await?
            .ok_or(AssistantError::ConversationNotFound)?;
        if conversation.user_id != user_id {
            return Err(AssistantError::NotOwner);
        }

        if let Some(kind) = phrases::classify(message, &self.config) {
            debug!("Conversation {} got a simple {:?} message", conversation_id, kind);
            let reply = kind.reply().to_string();
            let (stored, conversation) = self.store_reply(conversation_id, reply.clone()).await?;
            return Ok(AssistantReply {
                response: ChatAiResponse {
                    should_escalate: false,
                    reply,
                    confidence: None,
                    is_truncated: None,
                },
                message: stored,
                conversation,
                notifications: vec![],
            });
        }

        let embedding = self.model.embed(message).await?;

        let started = Instant::now();
        let threshold = self.config.escalation_threshold;
        let count = self.config.match_count;
        let matches = self
            .blocking(move |db| db.match_documents(&embedding, threshold, count))
            .await?;

        let best = matches
            .first()
            .map(|m| m.similarity)
            .filter(|similarity| *similarity >= threshold);

        let Some(confidence) = best else {
            return self.escalate(conversation_id).await;
        };

        let history_limit = self.config.history_limit;
        let (profile, history) = self
            .blocking(move |db| {
                Ok((
                    db.get_profile(user_id)?,
                    db.recent_messages(conversation_id, history_limit)?,
                ))
            })
            .await?;

        let prompt = render_support_prompt(&PromptContext {
            role: phrases::persona(message),
            question: message,
            documents: &matches,
            history: &history,
            profile: profile.as_ref(),
        });

        let generation = self.model.generate(&GenerationRequest::new(prompt)).await?;
        let mut reply = generation.text;
        if generation.truncated {
            reply.push_str(TRUNCATION_NOTICE);
        }

        let (stored, conversation) = self.store_reply(conversation_id, reply.clone()).await?;

        let elapsed = started.elapsed().as_secs() as i64;
        self.record_analytics(
            conversation_id,
            AnalyticsUpdate {
                ai_answered: Some(true),
                first_response_time_seconds: Some(elapsed),
                ..Default::default()
            },
        )
        .await;

        info!(
            "Answered conversation {} with {} (confidence {:.2}, truncated: {})",
            conversation_id,
            self.model.name(),
            confidence,
            generation.truncated
        );

        Ok(AssistantReply {
            response: ChatAiResponse {
                should_escalate: false,
                reply,
                confidence: Some(confidence),
                is_truncated: Some(generation.truncated),
            },
            message: stored,
            conversation,
            notifications: vec![],
        })
    }

    async fn escalate(&self, conversation_id: Uuid) -> Result<AssistantReply, AssistantError> {
        let notifications = self
            .blocking(move |db| {
                let batch: Vec<NewNotification> = db
                    .admin_ids()?
                    .into_iter()
                    .map(|admin_id| NewNotification {
                        user_id: admin_id,
                        kind: "support".into(),
                        priority: NotificationPriority::Medium,
                        message: "Question complexe nécessitant votre attention".into(),
                        link_to: Some(format!("/admin/support?conversation={}", conversation_id)),
                    })
                    .collect();
                db.insert_notifications(&batch)
            })
            .await?;

        info!(
            "Escalated conversation {} to {} admins",
            conversation_id,
            notifications.len()
        );

        let (stored, conversation) = self
            .store_reply(conversation_id, ESCALATION_REPLY.to_string())
            .await?;

        self.record_analytics(
            conversation_id,
            AnalyticsUpdate {
                escalated_to_admin: Some(true),
                ..Default::default()
            },
        )
        .await;

        Ok(AssistantReply {
            response: ChatAiResponse {
                should_escalate: true,
                reply: ESCALATION_REPLY.to_string(),
                confidence: None,
                is_truncated: None,
            },
            message: stored,
            conversation,
            notifications,
        })
    }

    /// Persist an assistant message and stamp the conversation's activity.
    async fn store_reply(
        &self,
        conversation_id: Uuid,
        reply: String,
    ) -> Result<(ChatMessage, Option<Conversation>), AssistantError> {
        self.blocking(move |db| {
            let stored = db.insert_message(conversation_id, AI_SENDER_ID, &reply, false)?;
            let conversation = db.touch_conversation(conversation_id)?;
            Ok((stored, conversation))
        })
        .await
    }

    /// Analytics are best effort: a failure is logged, never surfaced.
    async fn record_analytics(&self, conversation_id: Uuid, update: AnalyticsUpdate) {
        if let Err(e) = self
            .blocking(move |db| db.upsert_analytics(conversation_id, update))
            .await
        {
            warn!("Failed to record analytics for {}: {}", conversation_id, e);
        }
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T, AssistantError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let result = tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| anyhow::anyhow!("Store task failed: {}", e))?;
        Ok(result?)
    }
}
