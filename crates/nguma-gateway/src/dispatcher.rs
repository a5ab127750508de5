use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{trace, warn};
use uuid::Uuid;

use nguma_types::events::GatewayEvent;
use nguma_types::models::{ChatMessage, Conversation, Notification};

/// Who may receive a dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Connections subscribed to this conversation.
    Conversation(Uuid),
    /// A single user, on every connection they hold.
    User(Uuid),
    /// The conversation owner plus every admin connection.
    OwnerAndAdmins(Uuid),
}

impl Audience {
    pub fn reaches(&self, user_id: Uuid, is_admin: bool, subscriptions: &HashSet<Uuid>) -> bool {
        match self {
            Self::Conversation(id) => subscriptions.contains(id),
            Self::User(id) => *id == user_id,
            Self::OwnerAndAdmins(owner) => is_admin || *owner == user_id,
        }
    }
}

/// An event serialized once and shared across every receiving connection.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub audience: Audience,
    pub kind: &'static str,
    pub json: Arc<str>,
}

/// Fans gateway events out to connected clients.
#[derive(Clone)]
pub struct Dispatcher {
    tx: broadcast::Sender<Dispatch>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Dispatch> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn publish(&self, audience: Audience, event: &GatewayEvent) {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize {} event: {}", event.kind(), e);
                return;
            }
        };

        let dispatch = Dispatch {
            audience,
            kind: event.kind(),
            json: json.into(),
        };
        // No receivers just means nobody is connected.
        if self.tx.send(dispatch).is_err() {
            trace!("No gateway listeners for {}", event.kind());
        }
    }

    pub fn message_created(&self, message: &ChatMessage) {
        self.publish(
            Audience::Conversation(message.conversation_id),
            &GatewayEvent::MessageCreate {
                message: message.clone(),
            },
        );
    }

    pub fn conversation_updated(&self, conversation: &Conversation) {
        self.publish(
            Audience::OwnerAndAdmins(conversation.user_id),
            &GatewayEvent::ConversationUpdate {
                conversation: conversation.clone(),
            },
        );
    }

    pub fn notifications_created(&self, notifications: &[Notification]) {
        for n in notifications {
            self.publish(
                Audience::User(n.user_id),
                &GatewayEvent::NotificationCreate {
                    notification: n.clone(),
                },
            );
        }
    }
}
