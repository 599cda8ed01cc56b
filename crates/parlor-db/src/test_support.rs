use chrono::Utc;
use parlor_types::models::{
    Conversation, ConversationSettings, ConversationType, Message, MessagePriority,
    MessageReceipt, MessageType, ReceiptStatus, Role,
};
use uuid::Uuid;

use crate::Database;

pub(crate) fn user(db: &Database, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    db.create_user(id, name, "hash").unwrap();
    id
}

pub(crate) fn conversation(
    db: &Database,
    kind: ConversationType,
    members: &[(Uuid, Role)],
) -> Conversation {
    let now = Utc::now();
    let conversation = Conversation {
        id: Uuid::new_v4(),
        name: None,
        description: None,
        conversation_type: kind,
        created_by: members[0].0,
        settings: ConversationSettings::default(),
        is_active: true,
        is_public: false,
        created_at: now,
        updated_at: now,
    };
    db.insert_conversation(&conversation, members).unwrap();
    conversation
}

/// Text message with one `sent` receipt per recipient.
pub(crate) fn message(db: &Database, conversation_id: Uuid, sender: Uuid, recipients: &[Uuid]) -> Uuid {
    let now = Utc::now();
    let message = Message {
        id: Uuid::new_v4(),
        conversation_id,
        sender_id: sender,
        content: "hi".into(),
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
    };
    let receipts: Vec<MessageReceipt> = recipients
        .iter()
        .map(|&user_id| MessageReceipt {
            id: Uuid::new_v4(),
            message_id: message.id,
            user_id,
            status: ReceiptStatus::Sent,
            delivered_at: None,
            read_at: None,
            created_at: now,
            updated_at: now,
        })
        .collect();
    db.insert_message(&message, &receipts, None).unwrap();
    message.id
}
