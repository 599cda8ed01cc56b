use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use parlor_db::MessageAttachment;
use parlor_types::Expiring;
use parlor_types::api::{
    CreateMessageRequest, MessageResponse, PollView, ReactionGroup, UpdateMessageRequest,
};
use parlor_types::events::GatewayEvent;
use parlor_types::models::{
    Conversation, GameInvite, GameInviteStatus, Message, MessageType, Poll, PollOption,
    ReceiptStatus, SharedGameItem,
};

use crate::access::{
    active_conversation, live_message, message_context, participant_role, require,
    visible_message,
};
use crate::analytics::AnalyticsEvent;
use crate::error::{ApiError, ApiResult};
use crate::permissions::Action;
use crate::state::AppState;
use crate::system;

/// How long after sending a message its sender may still edit it.
pub const EDIT_WINDOW: Duration = Duration::hours(24);
/// Content left behind by a soft delete.
pub const DELETED_CONTENT: &str = "This message has been deleted";
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;
/// Reply chains are never followed further than this.
pub const MAX_REPLY_DEPTH: usize = 25;
pub const DEFAULT_INVITE_TTL: Duration = Duration::hours(24);
/// Longest lifetime a sender may ask for on a game invite.
pub const MAX_INVITE_TTL: Duration = Duration::days(7);
pub const MIN_POLL_OPTIONS: usize = 2;
pub const MAX_POLL_OPTIONS: usize = 10;
pub const MAX_CONTENT_LEN: usize = 4000;

// -- Create --

/// Validate, moderate, persist, and fan out a new message.
///
/// Checks run in a fixed order and the first failure aborts the call before
/// anything is written: participation, read-only, slow mode, type and feature
/// flags, then moderation.
pub async fn create_message(
    state: &AppState,
    sender_id: Uuid,
    req: CreateMessageRequest,
) -> ApiResult<MessageResponse> {
    let now = Utc::now();
    let conversation = active_conversation(state, req.conversation_id)?;
    let role = participant_role(state, conversation.id, sender_id)?;
    let settings = &conversation.settings;

    if settings.is_read_only {
        require(role, Action::PostInReadOnly, "This conversation is read-only")?;
    }

    if settings.slow_mode > 0 {
        if let Some(last) = state.db.last_message_at(conversation.id, sender_id)? {
            if let Some(remaining) = slow_mode_remaining(settings.slow_mode, last, now) {
                return Err(ApiError::SlowMode { remaining });
            }
        }
    }

    let kind = req.message_type;
    if kind == MessageType::System {
        return Err(ApiError::BadRequest(
            "System messages cannot be sent directly".into(),
        ));
    }
    if kind.is_media() {
        if !settings.allows_media {
            return Err(ApiError::BadRequest(
                "Media is not allowed in this conversation".into(),
            ));
        }
        if req.media_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
            return Err(ApiError::BadRequest(format!(
                "A media URL is required for {} messages",
                kind
            )));
        }
    }
    if let Some(reply_to_id) = req.reply_to_id {
        if !settings.allows_replies {
            return Err(ApiError::BadRequest(
                "Replies are disabled in this conversation".into(),
            ));
        }
        let parent = state.db.get_message(reply_to_id)?;
        if !parent.is_some_and(|p| p.conversation_id == conversation.id && p.is_visible_at(now)) {
            return Err(ApiError::BadRequest(
                "Reply target must be a message in this conversation".into(),
            ));
        }
    }

    let participants = state.db.participant_ids(conversation.id)?;
    let content = req.content.trim().to_string();
    if content.chars().count() > MAX_CONTENT_LEN {
        return Err(ApiError::BadRequest(format!(
            "Message content must be at most {} characters",
            MAX_CONTENT_LEN
        )));
    }

    let message_id = Uuid::new_v4();
    let attachment = build_attachment(&req, message_id, sender_id, &participants, now)?;
    let content = match (&attachment, content.is_empty()) {
        (Some(MessageAttachment::Poll(poll, _)), true) => poll.question.clone(),
        (None, true) if !kind.is_media() => {
            return Err(ApiError::BadRequest("Message content cannot be empty".into()));
        }
        _ => content,
    };

    if req.is_scheduled {
        match req.scheduled_for {
            Some(at) if at > now => {}
            _ => {
                return Err(ApiError::BadRequest(
                    "Scheduled messages need a scheduled time in the future".into(),
                ));
            }
        }
    } else if req.scheduled_for.is_some() {
        return Err(ApiError::BadRequest(
            "scheduled_for requires is_scheduled".into(),
        ));
    }

    if req.is_mentioning_everyone {
        require(
            role,
            Action::MentionEveryone,
            "Only owners and admins can mention everyone",
        )?;
    }
    let mut seen = HashSet::new();
    let mentioned: Vec<Uuid> = req
        .mentioned_user_ids
        .iter()
        .copied()
        .filter(|id| participants.contains(id) && seen.insert(*id))
        .collect();

    let mut message = system::new_message(conversation.id, sender_id, kind, content, now);
    message.id = message_id;
    message.priority = req.priority;
    message.reply_to_id = req.reply_to_id;
    message.media_url = req.media_url.filter(|url| !url.trim().is_empty());
    message.metadata = req.metadata;
    message.is_scheduled = req.is_scheduled;
    message.scheduled_for = req.scheduled_for;
    message.mentioned_user_ids = mentioned.clone();
    message.mentions_everyone = req.is_mentioning_everyone;

    if settings.is_moderated {
        moderate_into(state, &mut message).await?;
    }

    let receipts = system::receipts_for(message.id, sender_id, &participants, now);
    state
        .db
        .insert_message(&message, &receipts, attachment.as_ref())?;

    state.analytics.record(AnalyticsEvent::MessageSent {
        message_id: message.id,
        conversation_id: conversation.id,
        actor_id: sender_id,
        message_type: kind,
    });

    if message.is_scheduled {
        debug!("Message {} scheduled for {:?}", message.id, message.scheduled_for);
    } else {
        fan_out_created(state, &message, &participants, &mentioned).await;
    }

    let response = build_responses(state, vec![message], now)?;
    response
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("created message vanished").into())
}

/// Seconds still to wait, or None if the cooldown has elapsed.
fn slow_mode_remaining(slow_mode: u32, last: DateTime<Utc>, now: DateTime<Utc>) -> Option<u64> {
    let cooldown_ms = i64::from(slow_mode) * 1000;
    let elapsed_ms = (now - last).num_milliseconds().max(0);
    if elapsed_ms >= cooldown_ms {
        return None;
    }
    let remaining_ms = (cooldown_ms - elapsed_ms) as u64;
    Some(remaining_ms.div_ceil(1000))
}

fn build_attachment(
    req: &CreateMessageRequest,
    message_id: Uuid,
    sender_id: Uuid,
    participants: &[Uuid],
    now: DateTime<Utc>,
) -> ApiResult<Option<MessageAttachment>> {
    let kind = req.message_type;
    let misplaced = [
        (req.poll.is_some(), MessageType::Poll, "poll"),
        (req.game_invite.is_some(), MessageType::GameInvite, "game_invite"),
        (req.game_item.is_some(), MessageType::GameItem, "game_item"),
    ];
    for (present, expected, field) in misplaced {
        if present && kind != expected {
            return Err(ApiError::BadRequest(format!(
                "{} is only valid on {} messages",
                field, expected
            )));
        }
    }

    let attachment = match kind {
        MessageType::Poll => {
            let poll_req = req
                .poll
                .as_ref()
                .ok_or_else(|| ApiError::BadRequest("Poll messages need a poll".into()))?;
            let question = poll_req.question.trim();
            if question.is_empty() {
                return Err(ApiError::BadRequest("Poll question cannot be empty".into()));
            }
            let texts: Vec<&str> = poll_req.options.iter().map(|o| o.trim()).collect();
            if !(MIN_POLL_OPTIONS..=MAX_POLL_OPTIONS).contains(&texts.len()) {
                return Err(ApiError::BadRequest(format!(
                    "Polls need between {} and {} options",
                    MIN_POLL_OPTIONS, MAX_POLL_OPTIONS
                )));
            }
            if texts.iter().any(|t| t.is_empty()) {
                return Err(ApiError::BadRequest("Poll options cannot be empty".into()));
            }
            if poll_req.expires_at.is_some_and(|at| at <= now) {
                return Err(ApiError::BadRequest(
                    "Poll expiry must be in the future".into(),
                ));
            }

            let poll = Poll {
                id: Uuid::new_v4(),
                message_id,
                creator_id: sender_id,
                question: question.to_string(),
                is_multiple_choice: poll_req.is_multiple_choice,
                is_anonymous: poll_req.is_anonymous,
                is_closed: false,
                expires_at: poll_req.expires_at,
                created_at: now,
            };
            let options = texts
                .iter()
                .enumerate()
                .map(|(position, text)| PollOption {
                    id: Uuid::new_v4(),
                    poll_id: poll.id,
                    position: position as u32,
                    text: text.to_string(),
                })
                .collect();
            Some(MessageAttachment::Poll(poll, options))
        }
        MessageType::GameInvite => {
            let invite_req = req.game_invite.as_ref().ok_or_else(|| {
                ApiError::BadRequest("Game invite messages need a game invite".into())
            })?;
            if invite_req.game_type.trim().is_empty() {
                return Err(ApiError::BadRequest("Game type cannot be empty".into()));
            }
            if let Some(invited) = invite_req.invited_user_id {
                if invited == sender_id || !participants.contains(&invited) {
                    return Err(ApiError::BadRequest(
                        "Invited user must be another participant".into(),
                    ));
                }
            }
            let ttl = match invite_req.expires_in_secs {
                Some(0) => {
                    return Err(ApiError::BadRequest(
                        "Invite lifetime must be positive".into(),
                    ));
                }
                Some(secs) => Duration::seconds(
                    i64::try_from(secs)
                        .unwrap_or(i64::MAX)
                        .min(MAX_INVITE_TTL.num_seconds()),
                ),
                None => DEFAULT_INVITE_TTL,
            };
            Some(MessageAttachment::GameInvite(GameInvite {
                id: Uuid::new_v4(),
                message_id,
                sender_id,
                game_type: invite_req.game_type.trim().to_string(),
                game_room_id: invite_req.game_room_id.clone(),
                invited_user_id: invite_req.invited_user_id,
                status: GameInviteStatus::Pending,
                expires_at: now + ttl,
                responded_by: None,
                responded_at: None,
                created_at: now,
            }))
        }
        MessageType::GameItem => {
            let item_req = req.game_item.as_ref().ok_or_else(|| {
                ApiError::BadRequest("Game item messages need a game item".into())
            })?;
            if item_req.item_id.trim().is_empty() || item_req.name.trim().is_empty() {
                return Err(ApiError::BadRequest(
                    "Game items need an id and a name".into(),
                ));
            }
            Some(MessageAttachment::GameItem(SharedGameItem {
                id: Uuid::new_v4(),
                message_id,
                item_type: item_req.item_type.clone(),
                item_id: item_req.item_id.clone(),
                name: item_req.name.clone(),
                metadata: item_req.metadata.clone(),
                created_at: now,
            }))
        }
        _ => None,
    };

    Ok(attachment)
}

/// Run the message content through the gate. A reject aborts; a flag is
/// recorded on the message; a clean verdict clears earlier flags.
async fn moderate_into(state: &AppState, message: &mut Message) -> ApiResult<()> {
    let verdict = state.moderation.moderate(&message.content).await?;
    if !verdict.is_allowed {
        warn!(
            "Rejected message from {} in {}: {:?}",
            message.sender_id, message.conversation_id, verdict.reason
        );
        return Err(ApiError::BadRequest(format!(
            "Message rejected by moderation: {}",
            verdict.reason.as_deref().unwrap_or("content not allowed")
        )));
    }
    message.is_moderated = verdict.is_flagged;
    message.moderation_reason = if verdict.is_flagged {
        verdict.reason.or_else(|| Some("Flagged for review".into()))
    } else {
        None
    };
    Ok(())
}

async fn fan_out_created(
    state: &AppState,
    message: &Message,
    participants: &[Uuid],
    mentioned: &[Uuid],
) {
    let sender_id = message.sender_id;
    if message.mentions_everyone {
        state
            .dispatcher
            .send_to_users_except(
                participants,
                sender_id,
                GatewayEvent::EveryoneMentioned {
                    conversation_id: message.conversation_id,
                    message_id: message.id,
                    sender_id,
                },
            )
            .await;
    } else if !mentioned.is_empty() {
        state
            .dispatcher
            .send_to_users_except(
                mentioned,
                sender_id,
                GatewayEvent::Mentioned {
                    conversation_id: message.conversation_id,
                    message_id: message.id,
                    sender_id,
                },
            )
            .await;
    }

    state
        .dispatcher
        .send_to_users_except(
            participants,
            sender_id,
            GatewayEvent::MessageCreated {
                message: message.clone(),
            },
        )
        .await;
}

// -- Update --

/// Edit a message. Only the sender, only within the edit window, and never
/// across attachment types.
pub async fn update_message(
    state: &AppState,
    id: Uuid,
    user_id: Uuid,
    req: UpdateMessageRequest,
) -> ApiResult<MessageResponse> {
    let now = Utc::now();
    let mut message = state
        .db
        .get_message(id)?
        .ok_or_else(|| ApiError::not_found("Message"))?;
    if message.is_deleted {
        return Err(ApiError::BadRequest("Deleted messages cannot be edited".into()));
    }
    if now - message.created_at > EDIT_WINDOW {
        return Err(ApiError::BadRequest(format!(
            "Messages can only be edited within {} hours",
            EDIT_WINDOW.num_hours()
        )));
    }
    if message.sender_id != user_id {
        return Err(ApiError::Forbidden("Only the sender can edit this message".into()));
    }
    let (_, conversation, _) = message_context(state, message.clone(), user_id)?;

    if let Some(kind) = req.message_type {
        if kind != message.message_type
            && (kind.has_attachment()
                || message.message_type.has_attachment()
                || kind == MessageType::System
                || message.message_type == MessageType::System)
        {
            return Err(ApiError::BadRequest(format!(
                "A {} message cannot become a {} message",
                message.message_type, kind
            )));
        }
        message.message_type = kind;
    }
    if let Some(url) = req.media_url {
        message.media_url = Some(url).filter(|u| !u.trim().is_empty());
    }
    if message.message_type.is_media() {
        check_media(&conversation, &message)?;
    }
    if let Some(priority) = req.priority {
        message.priority = priority;
    }
    if let Some(metadata) = req.metadata {
        message.metadata = Some(metadata);
    }

    let content_changed = match req.content {
        Some(content) => {
            let content = content.trim().to_string();
            if content.is_empty() && !message.message_type.is_media() {
                return Err(ApiError::BadRequest("Message content cannot be empty".into()));
            }
            if content.chars().count() > MAX_CONTENT_LEN {
                return Err(ApiError::BadRequest(format!(
                    "Message content must be at most {} characters",
                    MAX_CONTENT_LEN
                )));
            }
            let changed = content != message.content;
            message.content = content;
            changed
        }
        None => false,
    };

    if conversation.settings.is_moderated && content_changed {
        moderate_into(state, &mut message).await?;
    }

    message.is_edited = true;
    message.edited_at = Some(now);
    message.updated_at = now;
    state.db.update_message(&message)?;

    if message.is_visible_at(now) {
        let participants = state.db.participant_ids(conversation.id)?;
        state
            .dispatcher
            .send_to_users_except(
                &participants,
                user_id,
                GatewayEvent::MessageUpdated {
                    message: message.clone(),
                },
            )
            .await;
    }

    let response = build_responses(state, vec![message], now)?;
    response
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("edited message vanished").into())
}

fn check_media(conversation: &Conversation, message: &Message) -> ApiResult<()> {
    if !conversation.settings.allows_media {
        return Err(ApiError::BadRequest(
            "Media is not allowed in this conversation".into(),
        ));
    }
    if message.media_url.is_none() {
        return Err(ApiError::BadRequest(format!(
            "A media URL is required for {} messages",
            message.message_type
        )));
    }
    Ok(())
}

// -- Delete --

/// Soft delete by the sender or any owner, admin, or moderator. The row
/// stays; its content becomes the tombstone and any pin is dropped.
pub async fn remove_message(state: &AppState, id: Uuid, user_id: Uuid) -> ApiResult<()> {
    let message = live_message(state, id)?;
    let (message, conversation, role) = message_context(state, message, user_id)?;
    if message.sender_id != user_id {
        require(
            role,
            Action::DeleteAnyMessage,
            "Only the sender or a moderator can delete this message",
        )?;
    }

    let now = Utc::now();
    state.db.soft_delete_message(id, DELETED_CONTENT, now)?;
    state.db.delete_pin(conversation.id, id)?;

    let participants = state.db.participant_ids(conversation.id)?;
    state
        .dispatcher
        .send_to_users_except(
            &participants,
            user_id,
            GatewayEvent::MessageDeleted {
                conversation_id: conversation.id,
                message_id: id,
                deleted_by: user_id,
            },
        )
        .await;

    state.analytics.record(AnalyticsEvent::MessageDeleted {
        message_id: id,
        actor_id: user_id,
    });

    Ok(())
}

// -- Read --

/// One page (1-based) of visible messages, newest first. Every returned
/// message the caller had not read is marked read, and each affected sender
/// is told once per message.
pub async fn find_all_messages(
    state: &AppState,
    conversation_id: Uuid,
    user_id: Uuid,
    page: Option<u32>,
    limit: Option<u32>,
) -> ApiResult<Vec<MessageResponse>> {
    active_conversation(state, conversation_id)?;
    participant_role(state, conversation_id, user_id)?;

    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let page = page.unwrap_or(1).max(1);
    let offset = (page - 1).saturating_mul(limit);
    let now = Utc::now();

    // Run the blocking reads and the receipt upgrade off the async runtime
    let db_state = state.clone();
    let (messages, upgraded) = tokio::task::spawn_blocking(move || {
        let messages = db_state
            .db
            .list_visible_messages(conversation_id, now, limit, offset)?;
        let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
        let upgraded = db_state.db.mark_read(user_id, &ids, now)?;
        Ok::<_, anyhow::Error>((messages, upgraded))
    })
    .await??;

    let senders: HashMap<Uuid, Uuid> = messages.iter().map(|m| (m.id, m.sender_id)).collect();
    for message_id in upgraded {
        let Some(&sender_id) = senders.get(&message_id) else {
            continue;
        };
        if sender_id == user_id {
            continue;
        }
        state
            .dispatcher
            .send_to_user(
                sender_id,
                GatewayEvent::ReceiptUpdated {
                    message_id,
                    user_id,
                    status: ReceiptStatus::Read,
                },
            )
            .await;
    }

    build_responses(state, messages, now)
}

/// A single visible message.
pub fn get_message(state: &AppState, id: Uuid, user_id: Uuid) -> ApiResult<MessageResponse> {
    let now = Utc::now();
    let message = visible_message(state, id, now)?;
    let (message, _, _) = message_context(state, message, user_id)?;
    build_responses(state, vec![message], now)?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Message"))
}

/// The message and its ancestors, root first. Ancestors are found by
/// repeated lookup of `reply_to_id`, stopping after `MAX_REPLY_DEPTH` hops,
/// at a message from another conversation, or on a repeated id.
pub fn get_reply_chain(state: &AppState, id: Uuid, user_id: Uuid) -> ApiResult<Vec<MessageResponse>> {
    let now = Utc::now();
    let message = visible_message(state, id, now)?;
    let (message, conversation, _) = message_context(state, message, user_id)?;

    let mut seen = HashSet::from([message.id]);
    let mut next = message.reply_to_id;
    let mut chain = vec![message];

    while let Some(parent_id) = next {
        if chain.len() > MAX_REPLY_DEPTH || !seen.insert(parent_id) {
            break;
        }
        let Some(parent) = state.db.get_message(parent_id)? else {
            break;
        };
        if parent.conversation_id != conversation.id {
            break;
        }
        next = parent.reply_to_id;
        chain.push(parent);
    }

    chain.reverse();
    build_responses(state, chain, now)
}

/// Attach reactions and any poll, game invite, or game item to each message.
/// Expired polls and invites found here are closed or expired on the spot.
pub(crate) fn build_responses(
    state: &AppState,
    messages: Vec<Message>,
    now: DateTime<Utc>,
) -> ApiResult<Vec<MessageResponse>> {
    let ids: Vec<Uuid> = messages.iter().map(|m| m.id).collect();
    let reactions = state.db.reactions_for_messages(&ids)?;

    // message_id -> reaction -> user_ids, reactions in first-seen order
    let mut grouped: HashMap<Uuid, BTreeMap<usize, ReactionGroup>> = HashMap::new();
    let mut order: HashMap<(Uuid, String), usize> = HashMap::new();
    for r in reactions {
        let next_index = order.len();
        let index = *order
            .entry((r.message_id, r.reaction.clone()))
            .or_insert(next_index);
        let group = grouped
            .entry(r.message_id)
            .or_default()
            .entry(index)
            .or_insert_with(|| ReactionGroup {
                reaction: r.reaction.clone(),
                count: 0,
                user_ids: Vec::new(),
            });
        group.count += 1;
        group.user_ids.push(r.user_id);
    }

    let mut responses = Vec::with_capacity(messages.len());
    for message in messages {
        let mut response = MessageResponse {
            reactions: grouped
                .remove(&message.id)
                .map(|groups| groups.into_values().collect())
                .unwrap_or_default(),
            poll: None,
            game_invite: None,
            game_item: None,
            message,
        };

        if response.message.is_deleted {
            responses.push(response);
            continue;
        }

        match response.message.message_type {
            MessageType::Poll => {
                if let Some(mut poll) = state.db.get_poll_by_message(response.message.id)? {
                    if !poll.is_closed && poll.is_expired(now) {
                        state.db.close_poll(poll.id)?;
                        poll.is_closed = true;
                    }
                    let options = state.db.poll_options(poll.id)?;
                    response.poll = Some(PollView { poll, options });
                }
            }
            MessageType::GameInvite => {
                if let Some(mut invite) = state.db.get_game_invite_by_message(response.message.id)? {
                    if invite.status == GameInviteStatus::Pending && invite.is_expired(now) {
                        invite.status = GameInviteStatus::Expired;
                        state.db.update_game_invite(&invite)?;
                    }
                    response.game_invite = Some(invite);
                }
            }
            MessageType::GameItem => {
                response.game_item = state.db.get_game_item_by_message(response.message.id)?;
            }
            _ => {}
        }
        responses.push(response);
    }

    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_mode_rounds_remaining_up() {
        let now = Utc::now();
        assert_eq!(slow_mode_remaining(10, now, now), Some(10));
        assert_eq!(
            slow_mode_remaining(10, now - Duration::milliseconds(9_100), now),
            Some(1)
        );
        assert_eq!(slow_mode_remaining(10, now - Duration::seconds(10), now), None);
    }

    #[test]
    fn attachment_fields_must_match_type() {
        let req = CreateMessageRequest {
            conversation_id: Uuid::new_v4(),
            content: "hi".into(),
            game_item: Some(parlor_types::api::CreateGameItemRequest {
                item_type: "skin".into(),
                item_id: "s-1".into(),
                name: "Gold".into(),
                metadata: None,
            }),
            ..Default::default()
        };
        let err = build_attachment(&req, Uuid::new_v4(), Uuid::new_v4(), &[], Utc::now())
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn poll_needs_two_to_ten_options() {
        let mut req = CreateMessageRequest {
            conversation_id: Uuid::new_v4(),
            message_type: MessageType::Poll,
            poll: Some(parlor_types::api::CreatePollRequest {
                question: "Best map?".into(),
                options: vec!["Dust".into()],
                is_multiple_choice: false,
                is_anonymous: false,
                expires_at: None,
            }),
            ..Default::default()
        };
        assert!(build_attachment(&req, Uuid::new_v4(), Uuid::new_v4(), &[], Utc::now()).is_err());

        if let Some(poll) = req.poll.as_mut() {
            poll.options = vec!["Dust".into(), "Inferno".into()];
        }
        let attachment =
            build_attachment(&req, Uuid::new_v4(), Uuid::new_v4(), &[], Utc::now()).unwrap();
        match attachment {
            Some(MessageAttachment::Poll(poll, options)) => {
                assert_eq!(poll.question, "Best map?");
                assert_eq!(options[1].position, 1);
            }
            other => panic!("unexpected attachment: {:?}", other),
        }
    }

    #[test]
    fn invite_lifetime_is_capped() {
        let now = Utc::now();
        let sender = Uuid::new_v4();
        let req = CreateMessageRequest {
            conversation_id: Uuid::new_v4(),
            message_type: MessageType::GameInvite,
            game_invite: Some(parlor_types::api::CreateGameInviteRequest {
                game_type: "chess".into(),
                game_room_id: None,
                invited_user_id: None,
                expires_in_secs: Some(u64::MAX),
            }),
            ..Default::default()
        };
        match build_attachment(&req, Uuid::new_v4(), sender, &[sender], now).unwrap() {
            Some(MessageAttachment::GameInvite(invite)) => {
                assert_eq!(invite.expires_at, now + MAX_INVITE_TTL);
            }
            other => panic!("unexpected attachment: {:?}", other),
        }
    }

    #[test]
    fn invite_defaults_to_a_day() {
        let now = Utc::now();
        let sender = Uuid::new_v4();
        let req = CreateMessageRequest {
            conversation_id: Uuid::new_v4(),
            message_type: MessageType::GameInvite,
            game_invite: Some(parlor_types::api::CreateGameInviteRequest {
                game_type: "chess".into(),
                game_room_id: None,
                invited_user_id: None,
                expires_in_secs: None,
            }),
            ..Default::default()
        };
        match build_attachment(&req, Uuid::new_v4(), sender, &[sender], now).unwrap() {
            Some(MessageAttachment::GameInvite(invite)) => {
                assert_eq!(invite.expires_at, now + DEFAULT_INVITE_TTL);
                assert_eq!(invite.status, GameInviteStatus::Pending);
            }
            other => panic!("unexpected attachment: {:?}", other),
        }
    }
}
