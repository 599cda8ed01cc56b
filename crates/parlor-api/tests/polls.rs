mod common;

use chrono::{Duration, Utc};
use common::*;
use parlor_api::ErrorKind;
use parlor_api::messages::{create_message, get_message};
use parlor_api::polls::{close_poll, get_poll_results, vote_poll};
use parlor_types::api::{CreateMessageRequest, CreatePollRequest, PollView};
use parlor_types::events::GatewayEvent;
use parlor_types::models::MessageType;
use uuid::Uuid;

fn poll_request(conversation_id: Uuid, multiple: bool, anonymous: bool) -> CreateMessageRequest {
    CreateMessageRequest {
        conversation_id,
        message_type: MessageType::Poll,
        poll: Some(CreatePollRequest {
            question: "Where to?".into(),
            options: vec!["X".into(), "Y".into()],
            is_multiple_choice: multiple,
            is_anonymous: anonymous,
            expires_at: None,
        }),
        ..Default::default()
    }
}

async fn post_poll(state: &parlor_api::AppState, sender: Uuid, req: CreateMessageRequest) -> PollView {
    create_message(state, sender, req).await.unwrap().poll.unwrap()
}

#[tokio::test]
async fn poll_message_takes_the_question() {
    let state = state();
    let a = user(&state, "ana");
    let group = group(&state, a, &[]).await;

    let sent = create_message(&state, a, poll_request(group.id, false, false))
        .await
        .unwrap();
    assert_eq!(sent.message.content, "Where to?");
    let view = sent.poll.unwrap();
    let texts: Vec<&str> = view.options.iter().map(|o| o.text.as_str()).collect();
    assert_eq!(texts, vec!["X", "Y"]);
}

#[tokio::test]
async fn poll_needs_two_to_ten_options() {
    let state = state();
    let a = user(&state, "ana");
    let group = group(&state, a, &[]).await;

    let mut req = poll_request(group.id, false, false);
    if let Some(poll) = req.poll.as_mut() {
        poll.options = vec!["only".into()];
    }
    let err = create_message(&state, a, req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let mut req = poll_request(group.id, false, false);
    if let Some(poll) = req.poll.as_mut() {
        poll.options = (0..11).map(|n| n.to_string()).collect();
    }
    let err = create_message(&state, a, req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);

    let mut req = poll_request(group.id, false, false);
    req.message_type = MessageType::Text;
    req.content = "not a poll".into();
    let err = create_message(&state, a, req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn single_choice_vote_is_replaced() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let group = group(&state, a, &[b]).await;
    let view = post_poll(&state, a, poll_request(group.id, false, false)).await;
    let (x, y) = (view.options[0].id, view.options[1].id);

    let first = vote_poll(&state, view.poll.id, x, b).await.unwrap();
    let second = vote_poll(&state, view.poll.id, y, b).await.unwrap();

    assert_eq!(first.id, second.id);
    let votes = state.db.user_poll_votes(view.poll.id, b).unwrap();
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].option_id, y);

    // Same option again is a no-op.
    let again = vote_poll(&state, view.poll.id, y, b).await.unwrap();
    assert_eq!(again.id, second.id);
    assert_eq!(state.db.poll_votes(view.poll.id).unwrap().len(), 1);
}

#[tokio::test]
async fn multi_choice_keeps_each_option_once() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let group = group(&state, a, &[b]).await;
    let view = post_poll(&state, a, poll_request(group.id, true, false)).await;
    let (x, y) = (view.options[0].id, view.options[1].id);

    vote_poll(&state, view.poll.id, x, b).await.unwrap();
    vote_poll(&state, view.poll.id, y, b).await.unwrap();
    assert_eq!(state.db.user_poll_votes(view.poll.id, b).unwrap().len(), 2);

    let err = vote_poll(&state, view.poll.id, x, b).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(state.db.user_poll_votes(view.poll.id, b).unwrap().len(), 2);
}

#[tokio::test]
async fn foreign_option_is_rejected() {
    let state = state();
    let a = user(&state, "ana");
    let group = group(&state, a, &[]).await;
    let first = post_poll(&state, a, poll_request(group.id, false, false)).await;
    let second = post_poll(&state, a, poll_request(group.id, false, false)).await;

    let err = vote_poll(&state, first.poll.id, second.options[0].id, a)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn anonymous_votes_hide_the_voter() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let group = group(&state, a, &[b]).await;
    let view = post_poll(&state, a, poll_request(group.id, false, true)).await;
    let mut rx_a = listen(&state, a).await;

    vote_poll(&state, view.poll.id, view.options[0].id, b).await.unwrap();

    let events = drain(&mut rx_a);
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], GatewayEvent::PollVote { user_id: None, .. }));

    let results = get_poll_results(&state, view.poll.id, a).unwrap();
    assert_eq!(results.total_votes, 1);
    assert_eq!(results.options[0].votes, 1);
    assert_eq!(results.options[0].percentage, 100);
    assert!(results.options.iter().all(|o| o.voter_ids.is_none()));
}

#[tokio::test]
async fn results_list_voters_when_public() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let c = user(&state, "cat");
    let group = group(&state, a, &[b, c]).await;
    let view = post_poll(&state, a, poll_request(group.id, false, false)).await;

    vote_poll(&state, view.poll.id, view.options[0].id, b).await.unwrap();
    vote_poll(&state, view.poll.id, view.options[1].id, c).await.unwrap();

    let results = get_poll_results(&state, view.poll.id, b).unwrap();
    assert_eq!(results.total_votes, 2);
    assert_eq!(results.options[0].percentage, 50);
    assert_eq!(results.options[0].voter_ids.as_deref(), Some(&[b][..]));
}

#[tokio::test]
async fn expired_poll_closes_on_vote() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let group = group(&state, a, &[b]).await;
    let mut req = poll_request(group.id, false, false);
    if let Some(poll) = req.poll.as_mut() {
        poll.expires_at = Some(Utc::now() + Duration::hours(1));
    }
    let view = post_poll(&state, a, req).await;
    expire(&state, "polls", view.poll.id);

    let err = vote_poll(&state, view.poll.id, view.options[0].id, b)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert!(state.db.get_poll(view.poll.id).unwrap().unwrap().is_closed);
    assert!(state.db.poll_votes(view.poll.id).unwrap().is_empty());

    let message = get_message(&state, view.poll.message_id, b).unwrap();
    assert!(message.poll.unwrap().poll.is_closed);
}

#[tokio::test]
async fn closing_is_creator_or_admin() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let c = user(&state, "cat");
    let group = group(&state, a, &[b, c]).await;
    let view = post_poll(&state, b, poll_request(group.id, false, false)).await;

    let err = close_poll(&state, view.poll.id, c).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let mut rx_c = listen(&state, c).await;
    let closed = close_poll(&state, view.poll.id, a).await.unwrap();
    assert!(closed.is_closed);
    assert_eq!(names(&drain(&mut rx_c)), vec!["poll:closed"]);

    // Closing again succeeds quietly.
    close_poll(&state, view.poll.id, b).await.unwrap();
    assert!(drain(&mut rx_c).is_empty());

    let err = vote_poll(&state, view.poll.id, view.options[0].id, c)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}
