use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored enum value that does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} value: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Declares a fieldless enum that is stored as TEXT in SQLite and serialized
/// with the same lowercase names over JSON.
macro_rules! string_enum {
    ($(#[$meta:meta])* pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

string_enum! {
    pub enum ConversationType {
        Direct => "direct",
        Group => "group",
        Channel => "channel",
        Team => "team",
        Guild => "guild",
        GameLobby => "game_lobby",
    }
}

impl ConversationType {
    /// Noun used in system messages ("Ana created this group.").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Direct => "conversation",
            Self::Group => "group",
            Self::Channel => "channel",
            Self::Team => "team",
            Self::Guild => "guild",
            Self::GameLobby => "lobby",
        }
    }
}

string_enum! {
    /// Declared from most to least privileged; `rank()` gives the numeric order.
    pub enum Role {
        Owner => "owner",
        Admin => "admin",
        Moderator => "moderator",
        Member => "member",
    }
}

impl Role {
    pub fn rank(&self) -> u8 {
        match self {
            Self::Owner => 3,
            Self::Admin => 2,
            Self::Moderator => 1,
            Self::Member => 0,
        }
    }

    pub fn outranks(&self, other: Role) -> bool {
        self.rank() > other.rank()
    }
}

string_enum! {
    pub enum MessageType {
        Text => "text",
        Image => "image",
        Video => "video",
        Audio => "audio",
        File => "file",
        System => "system",
        Poll => "poll",
        GameInvite => "game_invite",
        GameItem => "game_item",
        Announcement => "announcement",
    }
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Text
    }
}

impl MessageType {
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Image | Self::Video | Self::Audio | Self::File)
    }

    /// Types whose attachment rows are created with the message and cannot
    /// be added or removed by an edit.
    pub fn has_attachment(&self) -> bool {
        matches!(self, Self::Poll | Self::GameInvite | Self::GameItem)
    }
}

string_enum! {
    pub enum MessagePriority {
        Low => "low",
        Normal => "normal",
        High => "high",
        Urgent => "urgent",
    }
}

impl Default for MessagePriority {
    fn default() -> Self {
        Self::Normal
    }
}

string_enum! {
    /// Delivery state of one message for one recipient. Variant order is the
    /// transition order, so `a < b` means `b` is further along.
    pub enum ReceiptStatus {
        Sent => "sent",
        Delivered => "delivered",
        Read => "read",
    }
}

string_enum! {
    pub enum GameInviteStatus {
        Pending => "pending",
        Accepted => "accepted",
        Declined => "declined",
        Expired => "expired",
    }
}

/// Anything that passively expires. `is_expired` is the single definition of
/// expiry used by every read and interaction path.
pub trait Expiring {
    fn expires_at(&self) -> Option<DateTime<Utc>>;

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSettings {
    pub allows_media: bool,
    pub allows_replies: bool,
    pub allows_reactions: bool,
    pub is_moderated: bool,
    pub is_read_only: bool,
    /// Minimum seconds between two messages from the same sender; 0 disables.
    pub slow_mode: u32,
    pub max_participants: Option<u32>,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            allows_media: true,
            allows_replies: true,
            allows_reactions: true,
            is_moderated: false,
            is_read_only: false,
            slow_mode: 0,
            max_participants: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub conversation_type: ConversationType,
    pub created_by: Uuid,
    #[serde(flatten)]
    pub settings: ConversationSettings,
    pub is_active: bool,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRole {
    pub conversation_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub updated_at: DateTime<Utc>,
}

/// A participant joined with their role, as listed on a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMember {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub priority: MessagePriority,
    pub reply_to_id: Option<Uuid>,
    pub media_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub is_moderated: bool,
    pub moderation_reason: Option<String>,
    pub is_scheduled: bool,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub mentioned_user_ids: Vec<Uuid>,
    pub mentions_everyone: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Deleted messages and scheduled messages that are not yet due are
    /// hidden from every read path.
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        if self.is_deleted {
            return false;
        }
        !self.is_scheduled || self.scheduled_for.is_none_or(|at| at <= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub status: ReceiptStatus,
    pub delivered_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReaction {
    pub id: Uuid,
    pub message_id: Uuid,
    pub user_id: Uuid,
    pub reaction: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinnedMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub message_id: Uuid,
    pub pinned_by: Uuid,
    pub pinned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub id: Uuid,
    pub message_id: Uuid,
    pub creator_id: Uuid,
    pub question: String,
    pub is_multiple_choice: bool,
    pub is_anonymous: bool,
    pub is_closed: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Expiring for Poll {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub position: u32,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollVote {
    pub id: Uuid,
    pub poll_id: Uuid,
    pub option_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameInvite {
    pub id: Uuid,
    pub message_id: Uuid,
    pub sender_id: Uuid,
    pub game_type: String,
    pub game_room_id: Option<String>,
    /// When set, only this participant may respond.
    pub invited_user_id: Option<Uuid>,
    pub status: GameInviteStatus,
    pub expires_at: DateTime<Utc>,
    pub responded_by: Option<Uuid>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Expiring for GameInvite {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        Some(self.expires_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedGameItem {
    pub id: Uuid,
    pub message_id: Uuid,
    pub item_type: String,
    pub item_id: String,
    pub name: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_message(now: DateTime<Utc>) -> Message {
        Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            content: "gg".into(),
            message_type: MessageType::Text,
            priority: MessagePriority::Normal,
            reply_to_id: None,
            media_url: None,
            metadata: None,
            is_edited: false,
            edited_at: None,
            is_deleted: false,
            deleted_at: None,
            is_moderated: false,
            moderation_reason: None,
            is_scheduled: false,
            scheduled_for: None,
            mentioned_user_ids: vec![],
            mentions_everyone: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn receipt_status_orders_by_progress() {
        assert!(ReceiptStatus::Sent < ReceiptStatus::Delivered);
        assert!(ReceiptStatus::Delivered < ReceiptStatus::Read);
        assert_eq!(
            ReceiptStatus::Read.max(ReceiptStatus::Sent),
            ReceiptStatus::Read
        );
    }

    #[test]
    fn stored_names_parse_back() {
        assert_eq!("game_lobby".parse::<ConversationType>(), Ok(ConversationType::GameLobby));
        assert_eq!(MessageType::GameInvite.as_str(), "game_invite");
        let err = "superuser".parse::<Role>().unwrap_err();
        assert_eq!(err.kind, "Role");
    }

    #[test]
    fn serde_uses_stored_names() {
        let json = serde_json::to_string(&MessageType::GameItem).unwrap();
        assert_eq!(json, "\"game_item\"");
        let role: Role = serde_json::from_str("\"moderator\"").unwrap();
        assert_eq!(role, Role::Moderator);
    }

    #[test]
    fn role_rank() {
        assert!(Role::Owner.outranks(Role::Admin));
        assert!(Role::Moderator.outranks(Role::Member));
        assert!(!Role::Admin.outranks(Role::Admin));
    }

    #[test]
    fn expiry_is_inclusive_of_deadline() {
        let now = Utc::now();
        let mut poll = Poll {
            id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            question: "Best opener?".into(),
            is_multiple_choice: false,
            is_anonymous: false,
            is_closed: false,
            expires_at: None,
            created_at: now,
        };
        assert!(!poll.is_expired(now));

        poll.expires_at = Some(now);
        assert!(poll.is_expired(now));

        poll.expires_at = Some(now + Duration::seconds(5));
        assert!(!poll.is_expired(now));
    }

    #[test]
    fn scheduled_messages_hidden_until_due() {
        let now = Utc::now();
        let mut msg = sample_message(now);
        assert!(msg.is_visible_at(now));

        msg.is_scheduled = true;
        msg.scheduled_for = Some(now + Duration::minutes(10));
        assert!(!msg.is_visible_at(now));
        assert!(msg.is_visible_at(now + Duration::minutes(10)));

        msg.is_deleted = true;
        assert!(!msg.is_visible_at(now + Duration::hours(1)));
    }
}
