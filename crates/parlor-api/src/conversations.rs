use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use parlor_types::api::{
    AddParticipantsRequest, ConversationDetail, CreateConversationRequest,
    UpdateConversationRequest, UpdateRoleRequest,
};
use parlor_types::events::GatewayEvent;
use parlor_types::models::{Conversation, ConversationSettings, ConversationType, Role};

use crate::access::{active_conversation, participant_role, require};
use crate::analytics::AnalyticsEvent;
use crate::error::{ApiError, ApiResult};
use crate::permissions::Action;
use crate::state::AppState;
use crate::system;

const MAX_NAME_LEN: usize = 100;

/// Create a conversation. The creator is always a participant and owner.
/// A direct conversation between two users who already share one returns
/// the existing conversation instead.
pub async fn create_conversation(
    state: &AppState,
    creator_id: Uuid,
    req: CreateConversationRequest,
) -> ApiResult<Conversation> {
    let mut seen = HashSet::new();
    let participants: Vec<Uuid> = std::iter::once(creator_id)
        .chain(req.participant_ids.iter().copied())
        .filter(|id| seen.insert(*id))
        .collect();

    if req.conversation_type == ConversationType::Direct && participants.len() != 2 {
        return Err(ApiError::BadRequest(
            "Direct conversations require exactly 2 participants".into(),
        ));
    }
    if let Some(max) = req.settings.max_participants {
        if participants.len() > max as usize {
            return Err(ApiError::BadRequest(format!(
                "Conversation allows at most {} participants",
                max
            )));
        }
    }
    if req.admin_ids.iter().any(|id| !seen.contains(id)) {
        return Err(ApiError::BadRequest("Admins must be participants".into()));
    }

    let users = state.db.find_users(&participants)?;
    if users.len() != participants.len() {
        return Err(ApiError::NotFound("One or more participants do not exist".into()));
    }

    if req.conversation_type == ConversationType::Direct {
        if let Some(existing) = state
            .db
            .find_direct_conversation(participants[0], participants[1])?
        {
            debug!("Reusing direct conversation {}", existing.id);
            return Ok(existing);
        }
    }

    let name = clean_text(req.name, MAX_NAME_LEN, "Name")?;
    let description = clean_text(req.description, 1000, "Description")?;

    let mut settings = ConversationSettings::default();
    req.settings.apply(&mut settings);

    let now = Utc::now();
    let conversation = Conversation {
        id: Uuid::new_v4(),
        name,
        description,
        conversation_type: req.conversation_type,
        created_by: creator_id,
        settings,
        is_active: true,
        // Direct conversations are never joinable.
        is_public: req.is_public && req.conversation_type != ConversationType::Direct,
        created_at: now,
        updated_at: now,
    };

    let admins: HashSet<Uuid> = req.admin_ids.into_iter().collect();
    let members: Vec<(Uuid, Role)> = participants
        .iter()
        .map(|&id| {
            let role = if id == creator_id {
                Role::Owner
            } else if admins.contains(&id) {
                Role::Admin
            } else {
                Role::Member
            };
            (id, role)
        })
        .collect();

    state.db.insert_conversation(&conversation, &members)?;

    let creator_name = state.db.get_username(creator_id)?;
    let text = match conversation.conversation_type {
        ConversationType::Direct => format!("{} started a conversation.", creator_name),
        other => format!("{} created this {}.", creator_name, other.label()),
    };
    system::post(state, conversation.id, creator_id, text).await?;

    state
        .dispatcher
        .send_to_users_except(
            &participants,
            creator_id,
            GatewayEvent::ConversationCreated {
                conversation: conversation.clone(),
            },
        )
        .await;

    state.analytics.record(AnalyticsEvent::ConversationCreated {
        conversation_id: conversation.id,
        actor_id: creator_id,
        conversation_type: conversation.conversation_type,
        participants: participants.len(),
    });

    info!(
        "{} created {} conversation {}",
        creator_id, conversation.conversation_type, conversation.id
    );

    Ok(conversation)
}

/// Active conversations the user is in, most recently active first.
pub fn list_conversations(state: &AppState, user_id: Uuid) -> ApiResult<Vec<Conversation>> {
    Ok(state.db.list_conversations_for_user(user_id)?)
}

/// Conversation with its members. Non-participants may read public ones.
pub fn get_conversation(state: &AppState, id: Uuid, user_id: Uuid) -> ApiResult<ConversationDetail> {
    let conversation = active_conversation(state, id)?;
    if !conversation.is_public && !state.db.is_participant(id, user_id)? {
        return Err(ApiError::Forbidden(
            "You are not a participant in this conversation".into(),
        ));
    }
    detail(state, conversation)
}

pub fn detail(state: &AppState, conversation: Conversation) -> ApiResult<ConversationDetail> {
    let members = state.db.members(conversation.id)?;
    Ok(ConversationDetail {
        conversation,
        members,
    })
}

/// Update name, description, visibility, and settings. The type is fixed
/// at creation.
pub async fn update_conversation(
    state: &AppState,
    id: Uuid,
    actor_id: Uuid,
    req: UpdateConversationRequest,
) -> ApiResult<Conversation> {
    let mut conversation = active_conversation(state, id)?;
    let role = participant_role(state, id, actor_id)?;
    require(
        role,
        Action::UpdateSettings,
        "Only owners and admins can update this conversation",
    )?;

    if let Some(kind) = req.conversation_type {
        if kind != conversation.conversation_type {
            return Err(ApiError::BadRequest(
                "Conversation type cannot be changed".into(),
            ));
        }
    }

    let participants = state.db.participant_ids(id)?;
    if let Some(max) = req.settings.max_participants {
        if (max as usize) < participants.len() {
            return Err(ApiError::BadRequest(format!(
                "Conversation already has {} participants",
                participants.len()
            )));
        }
    }
    if req.is_public == Some(true) && conversation.conversation_type == ConversationType::Direct {
        return Err(ApiError::BadRequest(
            "Direct conversations cannot be public".into(),
        ));
    }

    if req.name.is_some() {
        conversation.name = clean_text(req.name, MAX_NAME_LEN, "Name")?;
    }
    if req.description.is_some() {
        conversation.description = clean_text(req.description, 1000, "Description")?;
    }
    if let Some(is_public) = req.is_public {
        conversation.is_public = is_public;
    }
    req.settings.apply(&mut conversation.settings);
    conversation.updated_at = Utc::now();

    state.db.update_conversation(&conversation)?;

    state
        .dispatcher
        .send_to_users_except(
            &participants,
            actor_id,
            GatewayEvent::ConversationUpdated {
                conversation: conversation.clone(),
            },
        )
        .await;

    Ok(conversation)
}

/// Soft delete. Owner only.
pub async fn remove_conversation(state: &AppState, id: Uuid, actor_id: Uuid) -> ApiResult<()> {
    let mut conversation = active_conversation(state, id)?;
    let role = participant_role(state, id, actor_id)?;
    require(
        role,
        Action::DeleteConversation,
        "Only the owner can delete this conversation",
    )?;

    conversation.is_active = false;
    conversation.updated_at = Utc::now();
    state.db.update_conversation(&conversation)?;

    let participants = state.db.participant_ids(id)?;
    state
        .dispatcher
        .send_to_users_except(
            &participants,
            actor_id,
            GatewayEvent::ConversationRemoved { conversation_id: id },
        )
        .await;

    info!("{} removed conversation {}", actor_id, id);
    Ok(())
}

/// Join a public conversation as a member.
pub async fn join_conversation(state: &AppState, id: Uuid, user_id: Uuid) -> ApiResult<Conversation> {
    let conversation = active_conversation(state, id)?;
    if !conversation.is_public {
        return Err(ApiError::Forbidden("This conversation is not public".into()));
    }

    let existing = state.db.participant_ids(id)?;
    if existing.contains(&user_id) {
        return Err(ApiError::Conflict(
            "You are already a participant in this conversation".into(),
        ));
    }
    check_capacity(&conversation, existing.len(), 1)?;

    state.db.add_participants(id, &[(user_id, Role::Member)], Utc::now())?;

    let username = state.db.get_username(user_id)?;
    system::post(state, id, user_id, format!("{} joined the conversation.", username)).await?;

    state
        .dispatcher
        .send_to_users(
            &existing,
            GatewayEvent::UserJoined {
                conversation_id: id,
                user_id,
                username,
            },
        )
        .await;

    state.analytics.record(AnalyticsEvent::ParticipantJoined {
        conversation_id: id,
        actor_id: user_id,
    });

    Ok(conversation)
}

/// Leave a conversation. An owner hands ownership to the earliest-joined
/// admin; with no admin present the owner cannot leave.
pub async fn leave_conversation(state: &AppState, id: Uuid, user_id: Uuid) -> ApiResult<()> {
    let conversation = active_conversation(state, id)?;
    if conversation.conversation_type == ConversationType::Direct {
        return Err(ApiError::BadRequest(
            "You cannot leave a direct conversation".into(),
        ));
    }

    let role = participant_role(state, id, user_id)?;
    let now = Utc::now();

    let successor = if role == Role::Owner {
        let successor = state
            .db
            .hand_over_and_leave(id, user_id, now)?
            .ok_or_else(|| {
                ApiError::BadRequest(
                    "Promote another participant to admin before leaving as owner".into(),
                )
            })?;
        Some(successor)
    } else {
        state.db.remove_participant(id, user_id)?;
        None
    };

    let username = state.db.get_username(user_id)?;
    system::post(state, id, user_id, format!("{} left the conversation.", username)).await?;

    let remaining = state.db.participant_ids(id)?;
    if let Some(successor) = successor {
        state
            .dispatcher
            .send_to_users(
                &remaining,
                GatewayEvent::RoleUpdated {
                    conversation_id: id,
                    user_id: successor,
                    role: Role::Owner,
                    updated_by: user_id,
                },
            )
            .await;
    }
    state
        .dispatcher
        .send_to_users(
            &remaining,
            GatewayEvent::UserLeft {
                conversation_id: id,
                user_id,
                username,
            },
        )
        .await;

    state.analytics.record(AnalyticsEvent::ParticipantLeft {
        conversation_id: id,
        actor_id: user_id,
    });

    Ok(())
}

/// Change a participant's role. Owners may change anyone; admins only
/// members and never to owner. Promoting someone to owner demotes the
/// current owner to admin in the same write.
pub async fn update_conversation_role(
    state: &AppState,
    id: Uuid,
    actor_id: Uuid,
    req: UpdateRoleRequest,
) -> ApiResult<()> {
    active_conversation(state, id)?;
    let actor_role = participant_role(state, id, actor_id)?;
    require(
        actor_role,
        Action::ManageRoles,
        "Only owners and admins can change roles",
    )?;

    let target_role = state
        .db
        .get_role(id, req.user_id)?
        .ok_or_else(|| ApiError::NotFound("User is not a participant in this conversation".into()))?;

    if actor_role == Role::Admin && (target_role != Role::Member || req.role == Role::Owner) {
        return Err(ApiError::Forbidden(
            "Admins can only change the role of members and cannot assign owner".into(),
        ));
    }
    if req.user_id == actor_id && actor_role == Role::Owner && req.role != Role::Owner {
        return Err(ApiError::BadRequest(
            "Transfer ownership before changing your own role".into(),
        ));
    }
    if target_role == req.role {
        return Ok(());
    }

    let now = Utc::now();
    let actor_name = state.db.get_username(actor_id)?;
    let target_name = state.db.get_username(req.user_id)?;

    let mut changes = vec![(req.user_id, req.role)];
    let text = if req.role == Role::Owner {
        state.db.transfer_ownership(id, actor_id, req.user_id, now)?;
        changes.push((actor_id, Role::Admin));
        format!("{} transferred ownership to {}.", actor_name, target_name)
    } else {
        state.db.set_role(id, req.user_id, req.role, now)?;
        format!("{} made {} {}.", actor_name, target_name, req.role)
    };

    system::post(state, id, actor_id, text).await?;

    let participants = state.db.participant_ids(id)?;
    for (user_id, role) in changes {
        state
            .dispatcher
            .send_to_users_except(
                &participants,
                actor_id,
                GatewayEvent::RoleUpdated {
                    conversation_id: id,
                    user_id,
                    role,
                    updated_by: actor_id,
                },
            )
            .await;
    }

    Ok(())
}

/// Add users as members. Owners and admins only; never for direct
/// conversations.
pub async fn add_participants(
    state: &AppState,
    id: Uuid,
    actor_id: Uuid,
    req: AddParticipantsRequest,
) -> ApiResult<Vec<Uuid>> {
    let conversation = active_conversation(state, id)?;
    if conversation.conversation_type == ConversationType::Direct {
        return Err(ApiError::BadRequest(
            "Direct conversations cannot gain participants".into(),
        ));
    }
    let role = participant_role(state, id, actor_id)?;
    require(
        role,
        Action::AddParticipants,
        "Only owners and admins can add participants",
    )?;

    let existing = state.db.participant_ids(id)?;
    let mut seen: HashSet<Uuid> = existing.iter().copied().collect();
    let added: Vec<Uuid> = req
        .user_ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .collect();
    if added.is_empty() {
        return Err(ApiError::Conflict(
            "All listed users are already participants".into(),
        ));
    }

    let users = state.db.find_users(&added)?;
    if users.len() != added.len() {
        return Err(ApiError::NotFound("One or more users do not exist".into()));
    }
    check_capacity(&conversation, existing.len(), added.len())?;

    let members: Vec<(Uuid, Role)> = added.iter().map(|&id| (id, Role::Member)).collect();
    state.db.add_participants(id, &members, Utc::now())?;

    let actor_name = state.db.get_username(actor_id)?;
    let participants = state.db.participant_ids(id)?;
    for user in users {
        system::post(
            state,
            id,
            actor_id,
            format!("{} added {}.", actor_name, user.username),
        )
        .await?;
        state
            .dispatcher
            .send_to_users_except(
                &participants,
                actor_id,
                GatewayEvent::UserJoined {
                    conversation_id: id,
                    user_id: user.id,
                    username: user.username,
                },
            )
            .await;
    }

    Ok(added)
}

/// Remove a participant holding a strictly lower role than the actor. The
/// owner can never be removed.
pub async fn remove_participant(
    state: &AppState,
    id: Uuid,
    actor_id: Uuid,
    user_id: Uuid,
) -> ApiResult<()> {
    let conversation = active_conversation(state, id)?;
    if conversation.conversation_type == ConversationType::Direct {
        return Err(ApiError::BadRequest(
            "Participants cannot be removed from a direct conversation".into(),
        ));
    }
    if user_id == actor_id {
        return Err(ApiError::BadRequest(
            "Use leave to exit a conversation".into(),
        ));
    }

    let actor_role = participant_role(state, id, actor_id)?;
    require(
        actor_role,
        Action::RemoveParticipants,
        "You cannot remove participants from this conversation",
    )?;

    if !state.db.is_participant(id, user_id)? {
        return Err(ApiError::NotFound(
            "User is not a participant in this conversation".into(),
        ));
    }
    let target_role = state.db.get_role(id, user_id)?.unwrap_or(Role::Member);
    if target_role == Role::Owner {
        return Err(ApiError::Forbidden("The owner cannot be removed".into()));
    }
    if !actor_role.outranks(target_role) {
        return Err(ApiError::Forbidden(format!(
            "A {} cannot remove a {}",
            actor_role, target_role
        )));
    }

    state.db.remove_participant(id, user_id)?;

    let actor_name = state.db.get_username(actor_id)?;
    let username = state.db.get_username(user_id)?;
    system::post(
        state,
        id,
        actor_id,
        format!("{} removed {}.", actor_name, username),
    )
    .await?;

    let mut notify = state.db.participant_ids(id)?;
    notify.push(user_id);
    state
        .dispatcher
        .send_to_users_except(
            &notify,
            actor_id,
            GatewayEvent::UserLeft {
                conversation_id: id,
                user_id,
                username,
            },
        )
        .await;

    state.analytics.record(AnalyticsEvent::ParticipantLeft {
        conversation_id: id,
        actor_id,
    });

    Ok(())
}

fn check_capacity(conversation: &Conversation, current: usize, adding: usize) -> ApiResult<()> {
    match conversation.settings.max_participants {
        Some(max) if current + adding > max as usize => Err(ApiError::BadRequest(format!(
            "Conversation is full ({} participants max)",
            max
        ))),
        _ => Ok(()),
    }
}

/// Trim optional text, treating blank as absent.
fn clean_text(value: Option<String>, max: usize, field: &str) -> ApiResult<Option<String>> {
    let Some(value) = value else { return Ok(None) };
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max {
        return Err(ApiError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(Some(trimmed.to_string()))
}
