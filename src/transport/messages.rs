//! Wire types for the participant/coordinator protocol (spec §6.1, §6.2).
//! Every frame is `{"type": ..., "payload": ...}`; type names are
//! case-sensitive and match the spec's literal `SCREAMING_SNAKE_CASE`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chain::FunctionSignature;
use crate::decoder::{DecodedTransaction, MetadataValidation};
use crate::model::{ParticipantId, SessionId, SessionStatus};

/// Role a connection authenticates as (spec §4.5: "the distinction is made
/// by the `AUTH` message's `role` field").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Coordinator,
    Participant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    pub session_id: String,
    pub pin: String,
    pub role: Role,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub public_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantReadyPayload {
    pub public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignaturePayloadWire {
    Single(String),
    Multi(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignatureSubmitPayload {
    pub public_key: String,
    pub signature: SignaturePayloadWire,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRejectedPayload {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionPayload {
    pub threshold: u32,
    #[serde(default)]
    pub eligible_public_keys: Vec<String>,
    pub expected_participants: u32,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub pin: Option<String>,
    /// Function signatures this session's decoder should use to verify a
    /// later contract-execute injection's selector (spec §4.2). Omit for
    /// sessions that never expect a contract-execute transaction.
    #[serde(default)]
    pub contract_interface: Option<Vec<FunctionSignature>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InjectTransactionPayload {
    pub session_id: String,
    pub frozen_transaction_base64: String,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelSessionPayload {
    pub session_id: String,
    pub reason: String,
}

/// Inbound client/coordinator frames (spec §6.1, §6.2).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    Auth(AuthPayload),
    ParticipantReady(ParticipantReadyPayload),
    SignatureSubmit(SignatureSubmitPayload),
    TransactionRejected(TransactionRejectedPayload),
    Ping,
    CreateSession(CreateSessionPayload),
    InjectTransaction(InjectTransactionPayload),
    CancelSession(CancelSessionPayload),
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub status: SessionStatus,
    pub threshold: u32,
    pub expected_participants: u32,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible_public_keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_details: Option<DecodedTransaction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrozenTransactionView {
    pub base64: String,
}

/// Outbound server → client frames (spec §6.2, plus `SESSION_CREATED` /
/// `TRANSACTION_INJECTED` for the coordinator role, spec §6.1).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    SessionCreated {
        session_id: String,
        pin: String,
        connection_string: String,
    },
    TransactionInjected {
        checksum: String,
        decoded: DecodedTransaction,
    },
    AuthSuccess {
        participant_id: ParticipantId,
        session_info: SessionInfo,
    },
    AuthFailed {
        message: String,
    },
    TransactionReceived {
        frozen_transaction: FrozenTransactionView,
        tx_details: DecodedTransaction,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        metadata_validation: Option<MetadataValidation>,
    },
    SignatureAccepted {
        public_key: String,
        count: u32,
        threshold: u32,
    },
    SignatureRejected {
        message: String,
        reason_code: String,
    },
    ThresholdMet {
        count: u32,
    },
    TransactionExecuted {
        transaction_id: String,
        receipt: crate::chain::ExecutionReceipt,
    },
    TransactionExpired,
    ParticipantConnected {
        participant_id: ParticipantId,
    },
    ParticipantReady {
        participant_id: ParticipantId,
    },
    ParticipantDisconnected {
        participant_id: ParticipantId,
    },
    SessionExpired,
    SessionCancelled {
        reason: String,
    },
    Error {
        message: String,
        code: String,
    },
    Pong,
}
