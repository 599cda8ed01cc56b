use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use parlor_types::Expiring;
use parlor_types::api::{PollOptionResult, PollResults};
use parlor_types::events::GatewayEvent;
use parlor_types::models::{Message, Poll, PollVote, Role};

use crate::access::{live_message, message_context, require};
use crate::analytics::AnalyticsEvent;
use crate::error::{ApiError, ApiResult};
use crate::permissions::Action;
use crate::state::AppState;

/// Poll, its message, and the caller's role, for a participant.
fn poll_context(state: &AppState, poll_id: Uuid, user_id: Uuid) -> ApiResult<(Poll, Message, Role)> {
    let poll = state
        .db
        .get_poll(poll_id)?
        .ok_or_else(|| ApiError::not_found("Poll"))?;
    let message = live_message(state, poll.message_id)?;
    let (message, _, role) = message_context(state, message, user_id)?;
    Ok((poll, message, role))
}

/// Cast a vote. Single-choice polls keep one row per user and move it;
/// multi-choice polls add a row per option.
pub async fn vote_poll(
    state: &AppState,
    poll_id: Uuid,
    option_id: Uuid,
    user_id: Uuid,
) -> ApiResult<PollVote> {
    let now = Utc::now();
    let (poll, message, _) = poll_context(state, poll_id, user_id)?;

    if poll.is_closed {
        return Err(ApiError::BadRequest("This poll is closed".into()));
    }
    if poll.is_expired(now) {
        state.db.close_poll(poll.id)?;
        return Err(ApiError::BadRequest("This poll has expired".into()));
    }

    let options = state.db.poll_options(poll.id)?;
    if !options.iter().any(|o| o.id == option_id) {
        return Err(ApiError::BadRequest("Option does not belong to this poll".into()));
    }

    let existing = state.db.user_poll_votes(poll.id, user_id)?;
    let vote = if poll.is_multiple_choice {
        if existing.iter().any(|v| v.option_id == option_id) {
            return Err(ApiError::Conflict("You already voted for this option".into()));
        }
        insert_vote(state, &poll, option_id, user_id)?
    } else {
        match existing.into_iter().next() {
            Some(vote) if vote.option_id == option_id => return Ok(vote),
            Some(mut vote) => {
                state.db.move_vote(vote.id, option_id, now)?;
                vote.option_id = option_id;
                vote.updated_at = now;
                vote
            }
            None => insert_vote(state, &poll, option_id, user_id)?,
        }
    };

    if poll.creator_id != user_id {
        state
            .dispatcher
            .send_to_user(
                poll.creator_id,
                GatewayEvent::PollVote {
                    poll_id: poll.id,
                    message_id: message.id,
                    option_id,
                    user_id: (!poll.is_anonymous).then_some(user_id),
                },
            )
            .await;
    }

    state.analytics.record(AnalyticsEvent::PollVoted {
        poll_id: poll.id,
        actor_id: user_id,
    });

    Ok(vote)
}

fn insert_vote(state: &AppState, poll: &Poll, option_id: Uuid, user_id: Uuid) -> ApiResult<PollVote> {
    let now = Utc::now();
    let vote = PollVote {
        id: Uuid::new_v4(),
        poll_id: poll.id,
        option_id,
        user_id,
        created_at: now,
        updated_at: now,
    };
    state.db.insert_vote(&vote)?;
    Ok(vote)
}

/// Tally votes per option. Voters are withheld for anonymous polls.
pub fn get_poll_results(state: &AppState, poll_id: Uuid, user_id: Uuid) -> ApiResult<PollResults> {
    let (mut poll, _, _) = poll_context(state, poll_id, user_id)?;
    if !poll.is_closed && poll.is_expired(Utc::now()) {
        state.db.close_poll(poll.id)?;
        poll.is_closed = true;
    }

    let options = state.db.poll_options(poll.id)?;
    let votes = state.db.poll_votes(poll.id)?;
    let total_votes = votes.len();

    let options = options
        .into_iter()
        .map(|option| {
            let voters: Vec<Uuid> = votes
                .iter()
                .filter(|v| v.option_id == option.id)
                .map(|v| v.user_id)
                .collect();
            PollOptionResult {
                option_id: option.id,
                text: option.text,
                position: option.position,
                votes: voters.len(),
                percentage: percentage(voters.len(), total_votes),
                voter_ids: (!poll.is_anonymous).then_some(voters),
            }
        })
        .collect();

    Ok(PollResults {
        poll_id: poll.id,
        question: poll.question,
        is_multiple_choice: poll.is_multiple_choice,
        is_anonymous: poll.is_anonymous,
        is_closed: poll.is_closed,
        expires_at: poll.expires_at,
        total_votes,
        options,
    })
}

/// Close a poll. The creator or any owner or admin may; closing twice is
/// harmless and only the first close is announced.
pub async fn close_poll(state: &AppState, poll_id: Uuid, user_id: Uuid) -> ApiResult<Poll> {
    let (mut poll, message, role) = poll_context(state, poll_id, user_id)?;
    if poll.creator_id != user_id {
        require(
            role,
            Action::CloseAnyPoll,
            "Only the poll creator or an admin can close this poll",
        )?;
    }
    if poll.is_closed {
        return Ok(poll);
    }

    state.db.close_poll(poll.id)?;
    poll.is_closed = true;

    let participants = state.db.participant_ids(message.conversation_id)?;
    state
        .dispatcher
        .send_to_users_except(
            &participants,
            user_id,
            GatewayEvent::PollClosed {
                poll_id: poll.id,
                message_id: message.id,
                closed_by: user_id,
            },
        )
        .await;

    info!("{} closed poll {}", user_id, poll.id);
    Ok(poll)
}

/// Whole-number share of `votes` in `total`; 0 when nobody voted.
pub fn percentage(votes: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (votes as f64 / total as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_to_nearest() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(4, 4), 100);
    }
}
