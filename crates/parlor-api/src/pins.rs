use chrono::Utc;
use uuid::Uuid;

use parlor_types::events::GatewayEvent;
use parlor_types::models::PinnedMessage;

use crate::access::{active_conversation, message_context, participant_role, require};
use crate::error::{ApiError, ApiResult};
use crate::permissions::Action;
use crate::state::AppState;

/// Most messages a conversation can have pinned at once.
pub const MAX_PINNED: u32 = 3;

pub async fn pin_message(state: &AppState, message_id: Uuid, user_id: Uuid) -> ApiResult<PinnedMessage> {
    let message = state
        .db
        .get_message(message_id)?
        .ok_or_else(|| ApiError::not_found("Message"))?;
    if message.is_deleted {
        return Err(ApiError::BadRequest("Deleted messages cannot be pinned".into()));
    }
    let now = Utc::now();
    if !message.is_visible_at(now) {
        return Err(ApiError::BadRequest(
            "Scheduled messages cannot be pinned before they are sent".into(),
        ));
    }
    let (message, conversation, role) = message_context(state, message, user_id)?;
    require(role, Action::PinMessages, "Only owners and admins can pin messages")?;

    if state.db.get_pin(conversation.id, message_id)?.is_some() {
        return Err(ApiError::Conflict("Message is already pinned".into()));
    }
    if state.db.count_pins(conversation.id)? >= MAX_PINNED {
        return Err(ApiError::BadRequest(format!(
            "A conversation can have at most {} pinned messages",
            MAX_PINNED
        )));
    }

    let pin = PinnedMessage {
        id: Uuid::new_v4(),
        conversation_id: conversation.id,
        message_id: message.id,
        pinned_by: user_id,
        pinned_at: now,
    };
    state.db.insert_pin(&pin)?;

    let participants = state.db.participant_ids(conversation.id)?;
    state
        .dispatcher
        .send_to_users_except(
            &participants,
            user_id,
            GatewayEvent::MessagePinned {
                conversation_id: conversation.id,
                message_id,
                pinned_by: user_id,
            },
        )
        .await;

    Ok(pin)
}

pub async fn unpin_message(state: &AppState, message_id: Uuid, user_id: Uuid) -> ApiResult<()> {
    let message = state
        .db
        .get_message(message_id)?
        .ok_or_else(|| ApiError::not_found("Message"))?;
    let (_, conversation, role) = message_context(state, message, user_id)?;
    require(role, Action::PinMessages, "Only owners and admins can unpin messages")?;

    if !state.db.delete_pin(conversation.id, message_id)? {
        return Err(ApiError::NotFound("Message is not pinned".into()));
    }

    let participants = state.db.participant_ids(conversation.id)?;
    state
        .dispatcher
        .send_to_users_except(
            &participants,
            user_id,
            GatewayEvent::MessageUnpinned {
                conversation_id: conversation.id,
                message_id,
                unpinned_by: user_id,
            },
        )
        .await;

    Ok(())
}

pub fn list_pinned(state: &AppState, conversation_id: Uuid, user_id: Uuid) -> ApiResult<Vec<PinnedMessage>> {
    active_conversation(state, conversation_id)?;
    participant_role(state, conversation_id, user_id)?;
    Ok(state.db.list_pins(conversation_id)?)
}
