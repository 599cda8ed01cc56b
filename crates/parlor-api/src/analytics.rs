use parlor_types::models::{ConversationType, GameInviteStatus, MessageType};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Business events recorded off the request path.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsEvent {
    ConversationCreated {
        conversation_id: Uuid,
        actor_id: Uuid,
        conversation_type: ConversationType,
        participants: usize,
    },
    ParticipantJoined {
        conversation_id: Uuid,
        actor_id: Uuid,
    },
    ParticipantLeft {
        conversation_id: Uuid,
        actor_id: Uuid,
    },
    MessageSent {
        message_id: Uuid,
        conversation_id: Uuid,
        actor_id: Uuid,
        message_type: MessageType,
    },
    MessageDeleted {
        message_id: Uuid,
        actor_id: Uuid,
    },
    PollVoted {
        poll_id: Uuid,
        actor_id: Uuid,
    },
    GameInviteResponded {
        invite_id: Uuid,
        actor_id: Uuid,
        status: GameInviteStatus,
    },
}

/// Fire-and-forget analytics sink. Recording never blocks and never fails
/// the caller.
#[derive(Clone, Default)]
pub struct Analytics {
    tx: Option<mpsc::UnboundedSender<AnalyticsEvent>>,
}

impl Analytics {
    /// Spawn the background writer. Must be called inside a tokio runtime.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                write_record(&event);
            }
        });
        Self::from_sender(tx)
    }

    pub fn from_sender(tx: mpsc::UnboundedSender<AnalyticsEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn record(&self, event: AnalyticsEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

fn write_record(event: &AnalyticsEvent) {
    match event {
        AnalyticsEvent::ConversationCreated {
            conversation_id,
            actor_id,
            conversation_type,
            participants,
        } => info!(
            target: "parlor::analytics",
            %conversation_id, %actor_id, %conversation_type, participants,
            "conversation_created"
        ),
        AnalyticsEvent::ParticipantJoined { conversation_id, actor_id } => {
            info!(target: "parlor::analytics", %conversation_id, %actor_id, "participant_joined")
        }
        AnalyticsEvent::ParticipantLeft { conversation_id, actor_id } => {
            info!(target: "parlor::analytics", %conversation_id, %actor_id, "participant_left")
        }
        AnalyticsEvent::MessageSent {
            message_id,
            conversation_id,
            actor_id,
            message_type,
        } => info!(
            target: "parlor::analytics",
            %message_id, %conversation_id, %actor_id, %message_type,
            "message_sent"
        ),
        AnalyticsEvent::MessageDeleted { message_id, actor_id } => {
            info!(target: "parlor::analytics", %message_id, %actor_id, "message_deleted")
        }
        AnalyticsEvent::PollVoted { poll_id, actor_id } => {
            info!(target: "parlor::analytics", %poll_id, %actor_id, "poll_voted")
        }
        AnalyticsEvent::GameInviteResponded {
            invite_id,
            actor_id,
            status,
        } => info!(
            target: "parlor::analytics",
            %invite_id, %actor_id, %status,
            "game_invite_responded"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_sink_is_swallowed() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let analytics = Analytics::from_sender(tx);
        analytics.record(AnalyticsEvent::PollVoted {
            poll_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
        });
    }

    #[test]
    fn events_reach_the_sink() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let analytics = Analytics::from_sender(tx);
        let event = AnalyticsEvent::MessageDeleted {
            message_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
        };
        analytics.record(event.clone());
        assert_eq!(rx.try_recv().unwrap(), event);
    }

    #[tokio::test]
    async fn spawned_writer_accepts_events() {
        let analytics = Analytics::spawn();
        analytics.record(AnalyticsEvent::ParticipantJoined {
            conversation_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
        });
    }
}
