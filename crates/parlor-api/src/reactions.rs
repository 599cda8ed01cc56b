use chrono::Utc;
use uuid::Uuid;

use parlor_types::events::GatewayEvent;
use parlor_types::models::MessageReaction;

use crate::access::{message_context, visible_message};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MAX_REACTION_LEN: usize = 32;

pub async fn add_reaction(
    state: &AppState,
    message_id: Uuid,
    reaction: &str,
    user_id: Uuid,
) -> ApiResult<MessageReaction> {
    let reaction = reaction.trim();
    if reaction.is_empty() || reaction.chars().count() > MAX_REACTION_LEN {
        return Err(ApiError::BadRequest(format!(
            "Reactions must be 1 to {} characters",
            MAX_REACTION_LEN
        )));
    }

    let now = Utc::now();
    let message = visible_message(state, message_id, now)?;
    let (message, conversation, _) = message_context(state, message, user_id)?;
    if !conversation.settings.allows_reactions {
        return Err(ApiError::BadRequest(
            "Reactions are disabled in this conversation".into(),
        ));
    }
    if state.db.find_reaction(message_id, user_id, reaction)?.is_some() {
        return Err(ApiError::Conflict("You already reacted with this".into()));
    }

    let row = MessageReaction {
        id: Uuid::new_v4(),
        message_id,
        user_id,
        reaction: reaction.to_string(),
        created_at: now,
    };
    state.db.insert_reaction(&row)?;

    let participants = state.db.participant_ids(conversation.id)?;
    state
        .dispatcher
        .send_to_users_except(
            &participants,
            user_id,
            GatewayEvent::ReactionAdded {
                conversation_id: message.conversation_id,
                message_id,
                user_id,
                reaction: row.reaction.clone(),
            },
        )
        .await;

    Ok(row)
}

pub async fn remove_reaction(
    state: &AppState,
    message_id: Uuid,
    reaction: &str,
    user_id: Uuid,
) -> ApiResult<()> {
    let reaction = reaction.trim();
    let message = visible_message(state, message_id, Utc::now())?;
    let (message, conversation, _) = message_context(state, message, user_id)?;

    if !state.db.delete_reaction(message_id, user_id, reaction)? {
        return Err(ApiError::not_found("Reaction"));
    }

    let participants = state.db.participant_ids(conversation.id)?;
    state
        .dispatcher
        .send_to_users_except(
            &participants,
            user_id,
            GatewayEvent::ReactionRemoved {
                conversation_id: message.conversation_id,
                message_id,
                user_id,
                reaction: reaction.to_string(),
            },
        )
        .await;

    Ok(())
}
