use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::trace;
use uuid::Uuid;

use parlor_types::events::GatewayEvent;

type SessionMap = HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>;

/// Process-local registry of connected sessions. Events are addressed to
/// users and copied to every session the user currently has open; a user
/// with no session simply misses the event.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// user_id -> (session_id -> sender)
    sessions: RwLock<HashMap<Uuid, SessionMap>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session for `user_id`. Returns (session_id, receiver).
    pub async fn register_session(
        &self,
        user_id: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let session_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .sessions
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(session_id, tx);
        (session_id, rx)
    }

    /// Drop one session. The user entry goes away with its last session.
    pub async fn unregister_session(&self, user_id: Uuid, session_id: Uuid) {
        let mut sessions = self.inner.sessions.write().await;
        if let Some(user_sessions) = sessions.get_mut(&user_id) {
            user_sessions.remove(&session_id);
            if user_sessions.is_empty() {
                sessions.remove(&user_id);
            }
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.sessions.read().await.contains_key(&user_id)
    }

    pub async fn session_count(&self, user_id: Uuid) -> usize {
        self.inner
            .sessions
            .read()
            .await
            .get(&user_id)
            .map_or(0, HashMap::len)
    }

    /// Deliver an event to every session of one user.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) {
        let sessions = self.inner.sessions.read().await;
        deliver(&sessions, user_id, &event);
    }

    /// Deliver one event to each listed user.
    pub async fn send_to_users<'a, I>(&self, user_ids: I, event: GatewayEvent)
    where
        I: IntoIterator<Item = &'a Uuid>,
    {
        let sessions = self.inner.sessions.read().await;
        for user_id in user_ids {
            deliver(&sessions, *user_id, &event);
        }
    }

    /// Deliver to each listed user except `skip` (usually the actor).
    pub async fn send_to_users_except(&self, user_ids: &[Uuid], skip: Uuid, event: GatewayEvent) {
        self.send_to_users(user_ids.iter().filter(|id| **id != skip), event)
            .await;
    }
}

fn deliver(sessions: &HashMap<Uuid, SessionMap>, user_id: Uuid, event: &GatewayEvent) {
    let Some(user_sessions) = sessions.get(&user_id) else {
        return;
    };
    for tx in user_sessions.values() {
        // A closed receiver means the session is tearing down; it unregisters itself.
        let _ = tx.send(event.clone());
    }
    trace!("{} -> {} ({} sessions)", event.name(), user_id, user_sessions.len());
}
