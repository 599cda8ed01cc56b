use chrono::Utc;
use uuid::Uuid;

use parlor_types::Expiring;
use parlor_types::events::GatewayEvent;
use parlor_types::models::{GameInvite, GameInviteStatus};

use crate::access::{live_message, message_context};
use crate::analytics::AnalyticsEvent;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::system;

/// Accept or decline a pending game invite.
pub async fn respond_to_game_invite(
    state: &AppState,
    invite_id: Uuid,
    status: GameInviteStatus,
    user_id: Uuid,
) -> ApiResult<GameInvite> {
    let mut invite = state
        .db
        .get_game_invite(invite_id)?
        .ok_or_else(|| ApiError::not_found("Game invite"))?;
    let message = live_message(state, invite.message_id)?;
    let (message, _, _) = message_context(state, message, user_id)?;

    let verb = match status {
        GameInviteStatus::Accepted => "accepted",
        GameInviteStatus::Declined => "declined",
        other => {
            return Err(ApiError::BadRequest(format!(
                "Invites can only be accepted or declined, not {}",
                other
            )));
        }
    };
    if invite.sender_id == user_id {
        return Err(ApiError::Forbidden("You cannot respond to your own invite".into()));
    }
    if invite.invited_user_id.is_some_and(|invited| invited != user_id) {
        return Err(ApiError::Forbidden("This invite is for another user".into()));
    }
    if invite.status != GameInviteStatus::Pending {
        return Err(ApiError::Conflict(format!(
            "This invite has already been {}",
            invite.status
        )));
    }

    let now = Utc::now();
    if invite.is_expired(now) {
        invite.status = GameInviteStatus::Expired;
        state.db.update_game_invite(&invite)?;
        return Err(ApiError::BadRequest("This invite has expired".into()));
    }

    invite.status = status;
    invite.responded_by = Some(user_id);
    invite.responded_at = Some(now);
    state.db.update_game_invite(&invite)?;

    let username = state.db.get_username(user_id)?;
    system::post(
        state,
        message.conversation_id,
        user_id,
        format!("{} {} the {} invite.", username, verb, invite.game_type),
    )
    .await?;

    state
        .dispatcher
        .send_to_user(
            invite.sender_id,
            GatewayEvent::GameInviteResponse {
                invite_id: invite.id,
                message_id: message.id,
                user_id,
                status,
            },
        )
        .await;

    state.analytics.record(AnalyticsEvent::GameInviteResponded {
        invite_id: invite.id,
        actor_id: user_id,
        status,
    });

    Ok(invite)
}
