//! Lookups shared by the services: each either returns the entity the
//! operation needs or the error the caller should surface.

use chrono::{DateTime, Utc};
use parlor_types::models::{Conversation, Message, Role};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::permissions::{Action, allows};
use crate::state::AppState;

/// Active conversation or NotFound. Soft-deleted conversations are absent.
pub(crate) fn active_conversation(state: &AppState, id: Uuid) -> ApiResult<Conversation> {
    state
        .db
        .get_conversation(id)?
        .filter(|c| c.is_active)
        .ok_or_else(|| ApiError::not_found("Conversation"))
}

/// Caller's role in the conversation, or Forbidden if they are not in it.
pub(crate) fn participant_role(state: &AppState, conversation_id: Uuid, user_id: Uuid) -> ApiResult<Role> {
    if !state.db.is_participant(conversation_id, user_id)? {
        return Err(ApiError::Forbidden(
            "You are not a participant in this conversation".into(),
        ));
    }
    Ok(state.db.get_role(conversation_id, user_id)?.unwrap_or(Role::Member))
}

pub(crate) fn require(role: Role, action: Action, message: &str) -> ApiResult<()> {
    if allows(role, action) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(message.to_string()))
    }
}

/// Message that has not been soft-deleted.
pub(crate) fn live_message(state: &AppState, id: Uuid) -> ApiResult<Message> {
    state
        .db
        .get_message(id)?
        .filter(|m| !m.is_deleted)
        .ok_or_else(|| ApiError::not_found("Message"))
}

/// Message as read paths see it: not deleted and, if scheduled, already due.
pub(crate) fn visible_message(state: &AppState, id: Uuid, now: DateTime<Utc>) -> ApiResult<Message> {
    state
        .db
        .get_message(id)?
        .filter(|m| m.is_visible_at(now))
        .ok_or_else(|| ApiError::not_found("Message"))
}

/// Message, its active conversation, and the caller's role in it.
pub(crate) fn message_context(
    state: &AppState,
    message: Message,
    user_id: Uuid,
) -> ApiResult<(Message, Conversation, Role)> {
    let conversation = active_conversation(state, message.conversation_id)?;
    let role = participant_role(state, conversation.id, user_id)?;
    Ok((message, conversation, role))
}
