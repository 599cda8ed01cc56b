mod common;

use common::*;
use parlor_api::ErrorKind;
use parlor_api::invites::respond_to_game_invite;
use parlor_api::messages::{create_message, find_all_messages};
use parlor_types::api::{CreateGameInviteRequest, CreateMessageRequest};
use parlor_types::models::{GameInvite, GameInviteStatus, MessageType};
use uuid::Uuid;

fn invite_request(conversation_id: Uuid, invited: Option<Uuid>) -> CreateMessageRequest {
    CreateMessageRequest {
        conversation_id,
        content: "Anyone up for chess?".into(),
        message_type: MessageType::GameInvite,
        game_invite: Some(CreateGameInviteRequest {
            game_type: "chess".into(),
            game_room_id: Some("room-7".into()),
            invited_user_id: invited,
            expires_in_secs: None,
        }),
        ..Default::default()
    }
}

async fn post_invite(state: &parlor_api::AppState, sender: Uuid, req: CreateMessageRequest) -> GameInvite {
    create_message(state, sender, req).await.unwrap().game_invite.unwrap()
}

#[tokio::test]
async fn accepting_notifies_sender_and_posts_notice() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let group = group(&state, a, &[b]).await;
    let invite = post_invite(&state, a, invite_request(group.id, None)).await;
    assert_eq!(invite.status, GameInviteStatus::Pending);
    let mut rx_a = listen(&state, a).await;

    let answered = respond_to_game_invite(&state, invite.id, GameInviteStatus::Accepted, b)
        .await
        .unwrap();

    assert_eq!(answered.status, GameInviteStatus::Accepted);
    assert_eq!(answered.responded_by, Some(b));
    assert!(answered.responded_at.is_some());
    let events = names(&drain(&mut rx_a));
    assert!(events.contains(&"game_invite:response"));
    assert!(events.contains(&"message:created"));

    let latest = find_all_messages(&state, group.id, a, Some(1), Some(1)).await.unwrap();
    assert_eq!(latest[0].message.content, "ben accepted the chess invite.");
}

#[tokio::test]
async fn invite_is_answered_once() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let c = user(&state, "cat");
    let group = group(&state, a, &[b, c]).await;
    let invite = post_invite(&state, a, invite_request(group.id, None)).await;

    respond_to_game_invite(&state, invite.id, GameInviteStatus::Declined, b)
        .await
        .unwrap();
    let err = respond_to_game_invite(&state, invite.id, GameInviteStatus::Accepted, c)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn only_the_invited_user_responds() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let c = user(&state, "cat");
    let group = group(&state, a, &[b, c]).await;
    let invite = post_invite(&state, a, invite_request(group.id, Some(b))).await;

    let err = respond_to_game_invite(&state, invite.id, GameInviteStatus::Accepted, c)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = respond_to_game_invite(&state, invite.id, GameInviteStatus::Accepted, a)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = respond_to_game_invite(&state, invite.id, GameInviteStatus::Expired, b)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    respond_to_game_invite(&state, invite.id, GameInviteStatus::Accepted, b)
        .await
        .unwrap();
}

#[tokio::test]
async fn expired_invite_flips_to_expired() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let group = group(&state, a, &[b]).await;
    let invite = post_invite(&state, a, invite_request(group.id, None)).await;
    expire(&state, "game_invites", invite.id);

    let err = respond_to_game_invite(&state, invite.id, GameInviteStatus::Accepted, b)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    let stored = state.db.get_game_invite(invite.id).unwrap().unwrap();
    assert_eq!(stored.status, GameInviteStatus::Expired);
}

#[tokio::test]
async fn invited_user_must_be_another_participant() {
    let state = state();
    let a = user(&state, "ana");
    let outsider = user(&state, "olga");
    let group = group(&state, a, &[]).await;

    let err = create_message(&state, a, invite_request(group.id, Some(outsider)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let err = create_message(&state, a, invite_request(group.id, Some(a)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}
