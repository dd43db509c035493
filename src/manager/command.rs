//! Messages accepted by a session actor's mailbox (spec §9 "tasks +
//! mailboxes" design note). Every command that can fail carries a oneshot
//! reply channel so the caller gets exactly one terminal response — the
//! "never silent" invariant of spec §7 enforced at this boundary.

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::decoder::DecodedTransaction;
use crate::model::{ParticipantId, SessionStatus, SignaturePayload};
use crate::transport::{Role, SessionInfo};
use crate::CoreResult;

pub enum AuthOutcome {
    Coordinator,
    Participant(ParticipantId),
}

pub struct AuthReply {
    pub outcome: AuthOutcome,
    pub session_info: SessionInfo,
}

pub struct SignatureOutcome {
    pub count: u32,
    pub threshold: u32,
    pub threshold_met: bool,
}

pub enum SessionCommand {
    Authenticate {
        pin: String,
        role: Role,
        label: Option<String>,
        subscription: crate::model::Subscription,
        reply: oneshot::Sender<CoreResult<AuthReply>>,
    },
    InjectTransaction {
        frozen: Vec<u8>,
        metadata: Option<serde_json::Value>,
        reply: oneshot::Sender<CoreResult<DecodedTransaction>>,
    },
    ParticipantReady {
        participant_id: ParticipantId,
        public_key: String,
        reply: oneshot::Sender<CoreResult<()>>,
    },
    SignatureSubmit {
        participant_id: ParticipantId,
        public_key: String,
        signature: SignaturePayload,
        reply: oneshot::Sender<CoreResult<SignatureOutcome>>,
    },
    ParticipantReject {
        participant_id: ParticipantId,
        reason: String,
        reply: oneshot::Sender<CoreResult<()>>,
    },
    Disconnect {
        participant_id: ParticipantId,
    },
    Cancel {
        reason: String,
        reply: oneshot::Sender<CoreResult<()>>,
    },
    /// Sent periodically by the expiry scheduler (spec §4.6); the actor
    /// checks its own `expires_at` and transitions/broadcasts if past due.
    /// Reaching a terminal state here does not end the actor task — it
    /// keeps running (inert) so the scheduler can still query it via
    /// [`SessionCommand::GetStatus`] during the grace period.
    CheckExpiry,
    /// Queried by the expiry scheduler to decide when a terminal session's
    /// grace period has elapsed and it can be removed from the store.
    GetStatus {
        reply: oneshot::Sender<(SessionStatus, Option<DateTime<Utc>>)>,
    },
    /// Ends the actor task. Sent by the scheduler once a terminal session's
    /// grace period has elapsed.
    Shutdown,
}
