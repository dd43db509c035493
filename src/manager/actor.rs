//! The per-session actor (spec §9): owns one [`Session`] exclusively and
//! drains its mailbox one [`SessionCommand`] at a time, so no lock is ever
//! held across an `.await`. Generalizes the teacher's single-threaded
//! mutation of `MpcCoordinator` (`mpc/coordinator.rs`) into an explicit
//! actor task.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use crate::chain::ChainAdapter;
use crate::decoder;
use crate::error::CoreError;
use crate::model::{Participant, Session, SessionStatus, Signature, SignaturePayload};
use crate::transport::{Role, ServerMessage, SessionInfo};
use crate::verify;
use crate::CoreResult;

use super::command::{AuthOutcome, AuthReply, SessionCommand, SignatureOutcome};

pub fn spawn(session: Session, chain: Arc<dyn ChainAdapter>, grace_period_ms: u64) -> mpsc::Sender<SessionCommand> {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(run(session, chain, grace_period_ms, rx));
    tx
}

async fn run(mut session: Session, chain: Arc<dyn ChainAdapter>, grace_period_ms: u64, mut rx: mpsc::Receiver<SessionCommand>) {
    let session_id = session.session_id;
    tracing::info!(session_id = %session_id, "session actor started");

    while let Some(cmd) = rx.recv().await {
        if handle_command(&mut session, &chain, grace_period_ms, cmd).await {
            break;
        }
    }

    tracing::info!(session_id = %session_id, status = ?session.status, "session actor stopped");
}

/// Returns `true` when the actor should exit after this command.
async fn handle_command(session: &mut Session, chain: &Arc<dyn ChainAdapter>, grace_period_ms: u64, cmd: SessionCommand) -> bool {
    match cmd {
        SessionCommand::Authenticate { pin, role, label, subscription, reply } => {
            let _ = reply.send(authenticate(session, &pin, role, label, subscription));
            false
        }
        SessionCommand::InjectTransaction { frozen, metadata, reply } => {
            let result = inject_transaction(session, chain.as_ref(), frozen, metadata);
            if result.is_ok() {
                if let Some(message) = transaction_received_message(session) {
                    broadcast(session, message);
                }
            }
            let _ = reply.send(result);
            false
        }
        SessionCommand::ParticipantReady { participant_id, public_key, reply } => {
            let result = participant_ready(session, participant_id, public_key);
            if result.is_ok() {
                broadcast(session, ServerMessage::ParticipantReady { participant_id });
                // A participant who becomes ready after the transaction was
                // already injected would otherwise never see it — hand it
                // directly to their own subscription.
                if let Some(message) = transaction_received_message(session) {
                    if let Some(sub) = session.participants.get(&participant_id).and_then(|p| p.subscription.clone()) {
                        let _ = sub.try_send(message);
                    }
                }
            }
            let _ = reply.send(result);
            false
        }
        SessionCommand::SignatureSubmit { participant_id, public_key, signature, reply } => {
            let result = signature_submit(session, chain.as_ref(), participant_id, &public_key, &signature).await;
            match &result {
                Ok(outcome) => {
                    broadcast(session, ServerMessage::SignatureAccepted {
                        public_key: public_key.clone(),
                        count: outcome.count,
                        threshold: outcome.threshold,
                    });
                    if outcome.threshold_met {
                        broadcast(session, ServerMessage::ThresholdMet { count: outcome.count });
                        execute(session, chain.as_ref(), grace_period_ms).await;
                    }
                }
                Err(e) => {
                    broadcast(session, ServerMessage::SignatureRejected {
                        message: e.to_string(),
                        reason_code: e.code().to_string(),
                    });
                }
            }
            let _ = reply.send(result);
            false
        }
        SessionCommand::ParticipantReject { participant_id, reason, reply } => {
            if let Some(p) = session.participants.get_mut(&participant_id) {
                p.status = crate::model::ParticipantStatus::Rejected;
            }
            mark_terminal(session, SessionStatus::Cancelled, grace_period_ms);
            broadcast(session, ServerMessage::SessionCancelled { reason: reason.clone() });
            let _ = reply.send(Ok(()));
            false
        }
        SessionCommand::Disconnect { participant_id } => {
            if let Some(p) = session.participants.get_mut(&participant_id) {
                p.mark_disconnected();
                broadcast(session, ServerMessage::ParticipantDisconnected { participant_id });
            }
            false
        }
        SessionCommand::Cancel { reason, reply } => {
            if session.status.is_terminal() {
                let _ = reply.send(Err(CoreError::TerminalState));
                return false;
            }
            mark_terminal(session, SessionStatus::Cancelled, grace_period_ms);
            broadcast(session, ServerMessage::SessionCancelled { reason });
            let _ = reply.send(Ok(()));
            false
        }
        SessionCommand::CheckExpiry => {
            if session.is_past_due(Utc::now()) {
                mark_terminal(session, SessionStatus::Expired, grace_period_ms);
                broadcast(session, ServerMessage::SessionExpired);
                return false;
            }
            if let (Some(decoded), false) = (&session.decoded_tx, session.status.is_terminal()) {
                if Utc::now().timestamp() >= decoded.expires_at_unix
                    && matches!(session.status, SessionStatus::TransactionReceived | SessionStatus::Signing)
                {
                    mark_terminal(session, SessionStatus::Expired, grace_period_ms);
                    broadcast(session, ServerMessage::TransactionExpired);
                }
            }
            false
        }
        SessionCommand::GetStatus { reply } => {
            let _ = reply.send((session.status, session.delete_at));
            false
        }
        SessionCommand::Shutdown => true,
    }
}

/// Transition `session` into a terminal status, stamping `completed_at` and
/// scheduling `delete_at` the first time it goes terminal, regardless of
/// which terminal status was reached, so the expiry scheduler has a single
/// deadline to compare against (spec §4.1, §4.6).
fn mark_terminal(session: &mut Session, status: SessionStatus, grace_period_ms: u64) {
    session.status = status;
    if session.completed_at.is_none() {
        let now = Utc::now();
        session.completed_at = Some(now);
        session.delete_at = Some(now + chrono::Duration::milliseconds(grace_period_ms as i64));
    }
}

fn authenticate(
    session: &mut Session,
    pin: &str,
    role: Role,
    label: Option<String>,
    subscription: crate::model::Subscription,
) -> CoreResult<AuthReply> {
    use subtle::ConstantTimeEq;
    if pin.as_bytes().ct_eq(session.pin.as_bytes()).unwrap_u8() != 1 {
        return Err(CoreError::WrongPin);
    }
    if session.status.is_terminal() {
        return Err(CoreError::TerminalState);
    }

    let outcome = match role {
        Role::Coordinator => {
            session.coordinator_subscription = Some(subscription);
            AuthOutcome::Coordinator
        }
        Role::Participant => {
            let participant_id = crate::model::ParticipantId::new();
            let participant = Participant::new(participant_id, label, subscription);
            session.participants.insert(participant_id, participant);
            broadcast(session, ServerMessage::ParticipantConnected { participant_id });
            AuthOutcome::Participant(participant_id)
        }
    };

    Ok(AuthReply { outcome, session_info: session_info(session) })
}

fn inject_transaction(
    session: &mut Session,
    chain: &dyn ChainAdapter,
    frozen: Vec<u8>,
    metadata: Option<serde_json::Value>,
) -> CoreResult<crate::decoder::DecodedTransaction> {
    if !session.status.can_transition_to(SessionStatus::TransactionReceived) {
        return Err(CoreError::TerminalState);
    }

    let decoded = decoder::decode(chain, &frozen, session.contract_interface.as_deref())?;

    let metadata_map = metadata.and_then(|v| match v {
        serde_json::Value::Object(m) => Some(m),
        _ => None,
    });

    session.frozen_transaction = Some(frozen);
    session.decoded_tx = Some(decoded.clone());
    session.metadata = metadata_map;
    session.transaction_received_at = Some(Utc::now());
    session.status = SessionStatus::TransactionReceived;

    Ok(decoded)
}

/// Builds the `TRANSACTION_RECEIVED` frame from the session's current
/// transaction state, if any has been injected yet.
fn transaction_received_message(session: &Session) -> Option<ServerMessage> {
    let decoded = session.decoded_tx.as_ref()?;
    let metadata_validation = session.metadata.as_ref().map(|m| decoder::validate_metadata(decoded, m));
    Some(ServerMessage::TransactionReceived {
        frozen_transaction: crate::transport::FrozenTransactionView {
            base64: session
                .frozen_transaction
                .as_ref()
                .map(|b| base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b))
                .unwrap_or_default(),
        },
        tx_details: decoded.clone(),
        metadata: session.metadata.clone().map(serde_json::Value::Object),
        metadata_validation,
    })
}

fn participant_ready(
    session: &mut Session,
    participant_id: crate::model::ParticipantId,
    public_key: String,
) -> CoreResult<()> {
    if !session.is_eligible(&public_key) {
        return Err(CoreError::IneligibleKey);
    }
    if session
        .participants
        .values()
        .any(|p| p.participant_id != participant_id && p.public_key.as_deref() == Some(public_key.as_str()))
    {
        return Err(CoreError::DuplicateKey);
    }

    let participant = session
        .participants
        .get_mut(&participant_id)
        .ok_or(CoreError::UnknownSession)?;
    participant.public_key = Some(public_key);
    participant.status = crate::model::ParticipantStatus::Ready;
    participant.ready_at = Some(Utc::now());
    Ok(())
}

async fn signature_submit(
    session: &mut Session,
    chain: &dyn ChainAdapter,
    participant_id: crate::model::ParticipantId,
    public_key: &str,
    signature: &SignaturePayload,
) -> CoreResult<SignatureOutcome> {
    if !matches!(session.status, SessionStatus::TransactionReceived | SessionStatus::Signing) {
        return if session.decoded_tx.is_none() {
            Err(CoreError::NoTransaction)
        } else {
            Err(CoreError::ThresholdAlreadyMet)
        };
    }
    if !session.is_eligible(public_key) {
        return Err(CoreError::IneligibleKey);
    }

    let frozen = session.frozen_transaction.as_ref().ok_or(CoreError::NoTransaction)?;
    let parts: Vec<Vec<u8>> = signature
        .parts()
        .into_iter()
        .map(|s| base64::Engine::decode(&base64::engine::general_purpose::STANDARD, s))
        .collect::<Result<_, _>>()
        .map_err(|_| CoreError::Verify(crate::verify::VerifyError::MalformedSignature))?;

    // A byte-identical resubmission for an already-recorded key is idempotent
    // success, not a duplicate rejection — it neither re-counts nor re-fires
    // THRESHOLD_MET. Only a differing resubmission is rejected.
    if let Some(existing) = session.signatures.get(public_key) {
        if existing.signature_bytes == parts {
            return Ok(SignatureOutcome {
                count: session.signatures.len() as u32,
                threshold: session.threshold,
                threshold_met: session.threshold_met(),
            });
        }
        return Err(CoreError::DuplicateKey);
    }

    verify::verify(chain, frozen, public_key, &parts).await?;

    session.signatures.insert(
        public_key.to_string(),
        Signature {
            public_key: public_key.to_string(),
            signature_bytes: parts,
            participant_id,
            received_at: Utc::now(),
            verified: true,
        },
    );

    if let Some(p) = session.participants.get_mut(&participant_id) {
        p.status = crate::model::ParticipantStatus::Signed;
        p.last_update = Utc::now();
    }

    if session.status == SessionStatus::TransactionReceived {
        session.status = SessionStatus::Signing;
    }

    let count = session.signatures.len() as u32;
    let threshold_met = session.threshold_met();
    if threshold_met {
        session.status = SessionStatus::Executing;
    }

    Ok(SignatureOutcome { count, threshold: session.threshold, threshold_met })
}

async fn execute(session: &mut Session, chain: &dyn ChainAdapter, grace_period_ms: u64) {
    let Some(frozen) = session.frozen_transaction.clone() else { return };

    let mut signed = frozen;
    for sig in session.signatures.values() {
        match chain.attach_signature(&signed, &sig.public_key, &sig.signature_bytes).await {
            Ok(updated) => signed = updated,
            Err(e) => return fail_execution(session, grace_period_ms, e),
        }
    }

    match chain.submit(&signed).await {
        Ok(receipt) => {
            mark_terminal(session, SessionStatus::Completed, grace_period_ms);
            broadcast(session, ServerMessage::TransactionExecuted {
                transaction_id: receipt.transaction_id.clone(),
                receipt,
            });
        }
        Err(e) => fail_execution(session, grace_period_ms, e),
    }
}

/// A `validity-window-expired` chain error is the expiry path, not a generic
/// execution failure: it takes the session to `expired` with a
/// `TRANSACTION_EXPIRED` broadcast, matching the same outcome the expiry
/// scheduler produces. Every other chain error is a genuine execution
/// failure (`failed` + `ERROR`).
fn fail_execution(session: &mut Session, grace_period_ms: u64, e: crate::chain::ChainError) {
    if matches!(e, crate::chain::ChainError::ValidityWindowExpired) {
        mark_terminal(session, SessionStatus::Expired, grace_period_ms);
        broadcast(session, ServerMessage::TransactionExpired);
        return;
    }
    mark_terminal(session, SessionStatus::Failed, grace_period_ms);
    broadcast(session, ServerMessage::Error { message: e.to_string(), code: CoreError::from(e).code().to_string() });
}

fn session_info(session: &Session) -> SessionInfo {
    SessionInfo {
        session_id: session.session_id.to_string(),
        status: session.status,
        threshold: session.threshold,
        expected_participants: session.expected_participants,
        expires_at: session.expires_at,
        eligible_public_keys: (!session.eligible_public_keys.is_empty()).then(|| session.eligible_public_keys.clone()),
        tx_details: session.decoded_tx.clone(),
    }
}

/// Fan out a server message to every connected subscriber (spec §4.5). A
/// full subscriber queue is dropped silently here; the transport layer is
/// responsible for noticing a stalled connection and disconnecting it.
fn broadcast(session: &Session, message: ServerMessage) {
    for sub in session.subscriptions() {
        let _ = sub.try_send(message.clone());
    }
}
