use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, Conversation, Notification};

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, is_admin: bool },

    /// A message row was inserted
    MessageCreate { message: ChatMessage },

    /// A conversation row changed (new message, read, closed)
    ConversationUpdate { conversation: Conversation },

    /// A notification was written for the receiving user
    NotificationCreate { notification: Notification },

    /// Acknowledges a subscription change with the accepted ids
    Subscribed { conversation_ids: Vec<Uuid> },
}

impl GatewayEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "Ready",
            Self::MessageCreate { .. } => "MessageCreate",
            Self::ConversationUpdate { .. } => "ConversationUpdate",
            Self::NotificationCreate { .. } => "NotificationCreate",
            Self::Subscribed { .. } => "Subscribed",
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Replace the set of conversations this connection listens to.
    Subscribe { conversation_ids: Vec<Uuid> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_adjacently_tagged() {
        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"Identify","data":{"token":"abc"}}"#).unwrap();
        assert!(matches!(cmd, GatewayCommand::Identify { token } if token == "abc"));
    }

    #[test]
    fn subscribed_event_serializes_with_tag() {
        let event = GatewayEvent::Subscribed { conversation_ids: vec![] };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"Subscribed","data":{"conversation_ids":[]}}"#);
    }
}
