#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use parlor_api::analytics::Analytics;
use parlor_api::conversations::create_conversation;
use parlor_api::moderation::ModerationGate;
use parlor_api::{AppState, AppStateInner};
use parlor_db::Database;
use parlor_gateway::Dispatcher;
use parlor_types::api::{CreateConversationRequest, CreateMessageRequest, SettingsPatch};
use parlor_types::events::GatewayEvent;
use parlor_types::models::{Conversation, ConversationType};

pub const SECRET: &str = "test-secret";

pub fn state() -> AppState {
    state_with(ModerationGate::Disabled)
}

pub fn state_with(moderation: ModerationGate) -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().expect("in-memory db"),
        dispatcher: Dispatcher::new(),
        moderation,
        analytics: Analytics::disabled(),
        jwt_secret: SECRET.to_string(),
    })
}

pub fn user(state: &AppState, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    state.db.create_user(id, name, "not-a-real-hash").unwrap();
    id
}

/// Register a gateway session for `user` and return its event stream.
pub async fn listen(state: &AppState, user: Uuid) -> mpsc::UnboundedReceiver<GatewayEvent> {
    state.dispatcher.register_session(user).await.1
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<GatewayEvent>) -> Vec<GatewayEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn names(events: &[GatewayEvent]) -> Vec<&'static str> {
    events.iter().map(GatewayEvent::name).collect()
}

pub fn conversation_request(
    kind: ConversationType,
    participants: &[Uuid],
    settings: SettingsPatch,
) -> CreateConversationRequest {
    CreateConversationRequest {
        conversation_type: kind,
        name: Some("room".into()),
        description: None,
        participant_ids: participants.to_vec(),
        admin_ids: Vec::new(),
        is_public: false,
        settings,
    }
}

pub async fn group(state: &AppState, owner: Uuid, others: &[Uuid]) -> Conversation {
    group_with(state, owner, others, SettingsPatch::default()).await
}

pub async fn group_with(
    state: &AppState,
    owner: Uuid,
    others: &[Uuid],
    settings: SettingsPatch,
) -> Conversation {
    create_conversation(
        state,
        owner,
        conversation_request(ConversationType::Group, others, settings),
    )
    .await
    .unwrap()
}

pub fn text(conversation_id: Uuid, content: &str) -> CreateMessageRequest {
    CreateMessageRequest {
        conversation_id,
        content: content.to_string(),
        ..Default::default()
    }
}

/// Rewrite a message's creation time, e.g. to push it past the edit window.
pub fn backdate_message(state: &AppState, message_id: Uuid, at: DateTime<Utc>) {
    state
        .db
        .with_conn(|conn| {
            conn.execute(
                "UPDATE messages SET created_at = ?1 WHERE id = ?2",
                (at.to_rfc3339_opts(SecondsFormat::Micros, true), message_id.to_string()),
            )?;
            Ok(())
        })
        .unwrap();
}

/// Move a poll's or game invite's expiry into the past. `table` is
/// `polls` or `game_invites`.
pub fn expire(state: &AppState, table: &str, id: Uuid) {
    let sql = format!("UPDATE {} SET expires_at = ?1 WHERE id = ?2", table);
    let past = Utc::now() - chrono::Duration::minutes(1);
    state
        .db
        .with_conn(|conn| {
            conn.execute(
                &sql,
                (past.to_rfc3339_opts(SecondsFormat::Micros, true), id.to_string()),
            )?;
            Ok(())
        })
        .unwrap();
}
