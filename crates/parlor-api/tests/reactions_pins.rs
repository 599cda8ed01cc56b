mod common;

use chrono::{Duration, Utc};
use common::*;
use parlor_api::ErrorKind;
use parlor_api::messages::{create_message, get_message, remove_message};
use parlor_api::pins::{list_pinned, pin_message, unpin_message};
use parlor_api::reactions::{add_reaction, remove_reaction};
use parlor_types::api::SettingsPatch;

#[tokio::test]
async fn reactions_group_by_emoji() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let group = group(&state, a, &[b]).await;
    let sent = create_message(&state, a, text(group.id, "news")).await.unwrap();
    let mut rx_a = listen(&state, a).await;

    add_reaction(&state, sent.message.id, "👍", a).await.unwrap();
    add_reaction(&state, sent.message.id, "👍", b).await.unwrap();
    add_reaction(&state, sent.message.id, "🎉", b).await.unwrap();

    let err = add_reaction(&state, sent.message.id, "👍", b).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let view = get_message(&state, sent.message.id, a).unwrap();
    assert_eq!(view.reactions.len(), 2);
    assert_eq!(view.reactions[0].reaction, "👍");
    assert_eq!(view.reactions[0].count, 2);
    assert_eq!(view.reactions[1].user_ids, vec![b]);
    assert_eq!(
        names(&drain(&mut rx_a)),
        vec!["message:reaction_added", "message:reaction_added"]
    );

    remove_reaction(&state, sent.message.id, "🎉", b).await.unwrap();
    let err = remove_reaction(&state, sent.message.id, "🎉", b).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(names(&drain(&mut rx_a)), vec!["message:reaction_removed"]);
}

#[tokio::test]
async fn reactions_respect_settings() {
    let state = state();
    let a = user(&state, "ana");
    let outsider = user(&state, "olga");
    let group = group_with(
        &state,
        a,
        &[],
        SettingsPatch {
            allows_reactions: Some(false),
            ..Default::default()
        },
    )
    .await;
    let sent = create_message(&state, a, text(group.id, "quiet")).await.unwrap();

    let err = add_reaction(&state, sent.message.id, "👍", a).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    let err = add_reaction(&state, sent.message.id, "👍", outsider).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = add_reaction(&state, sent.message.id, "  ", a).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn fourth_pin_is_rejected() {
    let state = state();
    let a = user(&state, "ana");
    let group = group(&state, a, &[]).await;
    let mut ids = Vec::new();
    for n in 0..4 {
        let sent = create_message(&state, a, text(group.id, &format!("m{}", n))).await.unwrap();
        ids.push(sent.message.id);
    }

    for id in &ids[..3] {
        pin_message(&state, *id, a).await.unwrap();
    }
    let err = pin_message(&state, ids[3], a).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(list_pinned(&state, group.id, a).unwrap().len(), 3);

    let err = pin_message(&state, ids[0], a).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    unpin_message(&state, ids[0], a).await.unwrap();
    pin_message(&state, ids[3], a).await.unwrap();
    assert_eq!(state.db.count_pins(group.id).unwrap(), 3);
}

#[tokio::test]
async fn members_cannot_pin() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let group = group(&state, a, &[b]).await;
    let sent = create_message(&state, b, text(group.id, "pin me")).await.unwrap();

    let err = pin_message(&state, sent.message.id, b).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let err = unpin_message(&state, sent.message.id, a).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn deleting_a_message_drops_its_pin() {
    let state = state();
    let a = user(&state, "ana");
    let group = group(&state, a, &[]).await;
    let sent = create_message(&state, a, text(group.id, "pinned")).await.unwrap();
    pin_message(&state, sent.message.id, a).await.unwrap();

    remove_message(&state, sent.message.id, a).await.unwrap();

    assert!(list_pinned(&state, group.id, a).unwrap().is_empty());
    let err = pin_message(&state, sent.message.id, a).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}

#[tokio::test]
async fn scheduled_message_cannot_be_pinned_early() {
    let state = state();
    let a = user(&state, "ana");
    let b = user(&state, "ben");
    let group = group(&state, a, &[b]).await;
    let mut req = text(group.id, "announcement at noon");
    req.is_scheduled = true;
    req.scheduled_for = Some(Utc::now() + Duration::hours(1));
    let sent = create_message(&state, a, req).await.unwrap();
    let mut rx_b = listen(&state, b).await;

    let err = pin_message(&state, sent.message.id, a).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert!(list_pinned(&state, group.id, a).unwrap().is_empty());
    assert!(drain(&mut rx_b).is_empty());
}
