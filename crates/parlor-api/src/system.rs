use chrono::{DateTime, Utc};
use parlor_types::events::GatewayEvent;
use parlor_types::models::{
    Message, MessagePriority, MessageReceipt, MessageType, ReceiptStatus,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::AppState;

/// One receipt per participant. The sender's own receipt starts read.
pub(crate) fn receipts_for(
    message_id: Uuid,
    sender_id: Uuid,
    participants: &[Uuid],
    now: DateTime<Utc>,
) -> Vec<MessageReceipt> {
    participants
        .iter()
        .map(|&user_id| {
            let own = user_id == sender_id;
            MessageReceipt {
                id: Uuid::new_v4(),
                message_id,
                user_id,
                status: if own { ReceiptStatus::Read } else { ReceiptStatus::Sent },
                delivered_at: own.then_some(now),
                read_at: own.then_some(now),
                created_at: now,
                updated_at: now,
            }
        })
        .collect()
}

/// Blank message of `message_type` from `sender_id`, created at `now`.
pub(crate) fn new_message(
    conversation_id: Uuid,
    sender_id: Uuid,
    message_type: MessageType,
    content: String,
    now: DateTime<Utc>,
) -> Message {
    Message {
        id: Uuid::new_v4(),
        conversation_id,
        sender_id,
        content,
        message_type,
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
        mentioned_user_ids: Vec::new(),
        mentions_everyone: false,
        created_at: now,
        updated_at: now,
    }
}

/// Record a conversation-state change as a system message attributed to
/// `actor_id`, with receipts for the current participants, and push it to
/// everyone but the actor.
pub(crate) async fn post(
    state: &AppState,
    conversation_id: Uuid,
    actor_id: Uuid,
    content: String,
) -> ApiResult<Message> {
    let now = Utc::now();
    let participants = state.db.participant_ids(conversation_id)?;
    let message = new_message(conversation_id, actor_id, MessageType::System, content, now);
    let receipts = receipts_for(message.id, actor_id, &participants, now);

    state.db.insert_message(&message, &receipts, None)?;

    state
        .dispatcher
        .send_to_users_except(
            &participants,
            actor_id,
            GatewayEvent::MessageCreated {
                message: message.clone(),
            },
        )
        .await;

    Ok(message)
}
