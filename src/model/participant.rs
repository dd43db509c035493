use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::ids::ParticipantId;
use super::status::ParticipantStatus;
use crate::transport::ServerMessage;

/// Outbound mailbox for a single connection. `None` once the participant
/// has disconnected; broadcasts silently skip a subscription in that state.
pub type Subscription = mpsc::Sender<ServerMessage>;

/// A single remote participant admitted to a session.
#[derive(Debug, Clone)]
pub struct Participant {
    pub participant_id: ParticipantId,
    pub label: Option<String>,
    pub status: ParticipantStatus,
    pub public_key: Option<String>,
    pub subscription: Option<Subscription>,
    pub connected_at: DateTime<Utc>,
    pub ready_at: Option<DateTime<Utc>>,
    pub last_update: DateTime<Utc>,
}

impl Participant {
    pub fn new(participant_id: ParticipantId, label: Option<String>, subscription: Subscription) -> Self {
        let now = Utc::now();
        Self {
            participant_id,
            label,
            status: ParticipantStatus::Connected,
            public_key: None,
            subscription: Some(subscription),
            connected_at: now,
            ready_at: None,
            last_update: now,
        }
    }

    pub fn mark_disconnected(&mut self) {
        self.status = ParticipantStatus::Disconnected;
        self.subscription = None;
        self.last_update = Utc::now();
    }

    pub fn is_connected(&self) -> bool {
        self.subscription.is_some()
    }
}
