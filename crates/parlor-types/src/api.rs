use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Conversation, ConversationMember, ConversationSettings, ConversationType, GameInvite,
    GameInviteStatus, Message, MessagePriority, MessageType, Poll, PollOption, ReceiptStatus,
    Role, SharedGameItem,
};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the gateway upgrade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Conversations --

/// Partial settings; unset fields keep their current (or default) value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub allows_media: Option<bool>,
    pub allows_replies: Option<bool>,
    pub allows_reactions: Option<bool>,
    pub is_moderated: Option<bool>,
    pub is_read_only: Option<bool>,
    pub slow_mode: Option<u32>,
    pub max_participants: Option<u32>,
}

impl SettingsPatch {
    pub fn apply(&self, settings: &mut ConversationSettings) {
        if let Some(v) = self.allows_media {
            settings.allows_media = v;
        }
        if let Some(v) = self.allows_replies {
            settings.allows_replies = v;
        }
        if let Some(v) = self.allows_reactions {
            settings.allows_reactions = v;
        }
        if let Some(v) = self.is_moderated {
            settings.is_moderated = v;
        }
        if let Some(v) = self.is_read_only {
            settings.is_read_only = v;
        }
        if let Some(v) = self.slow_mode {
            settings.slow_mode = v;
        }
        if let Some(v) = self.max_participants {
            settings.max_participants = Some(v);
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(rename = "type")]
    pub conversation_type: ConversationType,
    pub name: Option<String>,
    pub description: Option<String>,
    pub participant_ids: Vec<Uuid>,
    #[serde(default)]
    pub admin_ids: Vec<Uuid>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(flatten)]
    pub settings: SettingsPatch,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateConversationRequest {
    /// Accepted only so a change attempt can be rejected explicitly.
    #[serde(rename = "type")]
    pub conversation_type: Option<ConversationType>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    #[serde(flatten)]
    pub settings: SettingsPatch,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoleRequest {
    pub user_id: Uuid,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddParticipantsRequest {
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub members: Vec<ConversationMember>,
}

// -- Messages --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub is_multiple_choice: bool,
    #[serde(default)]
    pub is_anonymous: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGameInviteRequest {
    pub game_type: String,
    pub game_room_id: Option<String>,
    pub invited_user_id: Option<Uuid>,
    /// Overrides the default invite lifetime.
    pub expires_in_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateGameItemRequest {
    pub item_type: String,
    pub item_id: String,
    pub name: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMessageRequest {
    pub conversation_id: Uuid,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub priority: MessagePriority,
    pub reply_to_id: Option<Uuid>,
    pub media_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub mentioned_user_ids: Vec<Uuid>,
    #[serde(default)]
    pub is_mentioning_everyone: bool,
    #[serde(default)]
    pub is_scheduled: bool,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub poll: Option<CreatePollRequest>,
    pub game_invite: Option<CreateGameInviteRequest>,
    pub game_item: Option<CreateGameItemRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMessageRequest {
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<MessageType>,
    pub priority: Option<MessagePriority>,
    pub media_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollView {
    #[serde(flatten)]
    pub poll: Poll,
    pub options: Vec<PollOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    #[serde(flatten)]
    pub message: Message,
    pub reactions: Vec<ReactionGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_invite: Option<GameInvite>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_item: Option<SharedGameItem>,
}

// -- Receipts --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateReceiptRequest {
    pub status: ReceiptStatus,
}

// -- Reactions --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddReactionRequest {
    pub reaction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionGroup {
    pub reaction: String,
    pub count: usize,
    pub user_ids: Vec<Uuid>,
}

// -- Polls --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub option_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollOptionResult {
    pub option_id: Uuid,
    pub text: String,
    pub position: u32,
    pub votes: usize,
    pub percentage: u32,
    /// Withheld for anonymous polls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voter_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollResults {
    pub poll_id: Uuid,
    pub question: String,
    pub is_multiple_choice: bool,
    pub is_anonymous: bool,
    pub is_closed: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub total_votes: usize,
    pub options: Vec<PollOptionResult>,
}

// -- Game invites --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespondGameInviteRequest {
    pub status: GameInviteStatus,
}
