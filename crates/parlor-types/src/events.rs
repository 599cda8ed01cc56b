use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Conversation, GameInviteStatus, Message, ReceiptStatus, Role};

/// Events pushed to connected sessions over the WebSocket gateway.
///
/// Serialized as `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum GatewayEvent {
    /// Server confirms the session is authenticated and registered
    #[serde(rename = "ready")]
    Ready { user_id: Uuid, username: String },

    #[serde(rename = "conversation:created")]
    ConversationCreated { conversation: Conversation },

    #[serde(rename = "conversation:updated")]
    ConversationUpdated { conversation: Conversation },

    #[serde(rename = "conversation:removed")]
    ConversationRemoved { conversation_id: Uuid },

    #[serde(rename = "conversation:user_joined")]
    UserJoined {
        conversation_id: Uuid,
        user_id: Uuid,
        username: String,
    },

    #[serde(rename = "conversation:user_left")]
    UserLeft {
        conversation_id: Uuid,
        user_id: Uuid,
        username: String,
    },

    #[serde(rename = "conversation:role_updated")]
    RoleUpdated {
        conversation_id: Uuid,
        user_id: Uuid,
        role: Role,
        updated_by: Uuid,
    },

    #[serde(rename = "message:created")]
    MessageCreated { message: Message },

    #[serde(rename = "message:updated")]
    MessageUpdated { message: Message },

    #[serde(rename = "message:deleted")]
    MessageDeleted {
        conversation_id: Uuid,
        message_id: Uuid,
        deleted_by: Uuid,
    },

    /// Sent only to the users named in `mentioned_user_ids`
    #[serde(rename = "message:mentioned")]
    Mentioned {
        conversation_id: Uuid,
        message_id: Uuid,
        sender_id: Uuid,
    },

    #[serde(rename = "message:everyone_mentioned")]
    EveryoneMentioned {
        conversation_id: Uuid,
        message_id: Uuid,
        sender_id: Uuid,
    },

    #[serde(rename = "message:reaction_added")]
    ReactionAdded {
        conversation_id: Uuid,
        message_id: Uuid,
        user_id: Uuid,
        reaction: String,
    },

    #[serde(rename = "message:reaction_removed")]
    ReactionRemoved {
        conversation_id: Uuid,
        message_id: Uuid,
        user_id: Uuid,
        reaction: String,
    },

    #[serde(rename = "message:pinned")]
    MessagePinned {
        conversation_id: Uuid,
        message_id: Uuid,
        pinned_by: Uuid,
    },

    #[serde(rename = "message:unpinned")]
    MessageUnpinned {
        conversation_id: Uuid,
        message_id: Uuid,
        unpinned_by: Uuid,
    },

    /// Sent to the message's sender when a recipient's receipt advances
    #[serde(rename = "receipt:updated")]
    ReceiptUpdated {
        message_id: Uuid,
        user_id: Uuid,
        status: ReceiptStatus,
    },

    /// Sent to the poll creator; `user_id` is withheld for anonymous polls
    #[serde(rename = "poll:vote")]
    PollVote {
        poll_id: Uuid,
        message_id: Uuid,
        option_id: Uuid,
        user_id: Option<Uuid>,
    },

    #[serde(rename = "poll:closed")]
    PollClosed {
        poll_id: Uuid,
        message_id: Uuid,
        closed_by: Uuid,
    },

    #[serde(rename = "game_invite:response")]
    GameInviteResponse {
        invite_id: Uuid,
        message_id: Uuid,
        user_id: Uuid,
        status: GameInviteStatus,
    },
}

impl GatewayEvent {
    /// Wire name of the event, as it appears in the `event` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready { .. } => "ready",
            Self::ConversationCreated { .. } => "conversation:created",
            Self::ConversationUpdated { .. } => "conversation:updated",
            Self::ConversationRemoved { .. } => "conversation:removed",
            Self::UserJoined { .. } => "conversation:user_joined",
            Self::UserLeft { .. } => "conversation:user_left",
            Self::RoleUpdated { .. } => "conversation:role_updated",
            Self::MessageCreated { .. } => "message:created",
            Self::MessageUpdated { .. } => "message:updated",
            Self::MessageDeleted { .. } => "message:deleted",
            Self::Mentioned { .. } => "message:mentioned",
            Self::EveryoneMentioned { .. } => "message:everyone_mentioned",
            Self::ReactionAdded { .. } => "message:reaction_added",
            Self::ReactionRemoved { .. } => "message:reaction_removed",
            Self::MessagePinned { .. } => "message:pinned",
            Self::MessageUnpinned { .. } => "message:unpinned",
            Self::ReceiptUpdated { .. } => "receipt:updated",
            Self::PollVote { .. } => "poll:vote",
            Self::PollClosed { .. } => "poll:closed",
            Self::GameInviteResponse { .. } => "game_invite:response",
        }
    }
}
