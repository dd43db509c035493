//! Session Manager (spec §4.4): the single entry point the transport layer
//! calls into. Owns no session state itself — each session lives in its own
//! actor task (`manager::actor`), reachable through a [`SessionHandle`]
//! registered in the [`SessionStore`]. Grounded directly in
//! `mpc/coordinator.rs::MpcCoordinator`'s `request_signing`/`submit_share`
//! shape, generalized to the richer session/participant/signature model.

mod actor;
mod command;

pub use command::{AuthOutcome, AuthReply, SessionCommand, SignatureOutcome};

use std::sync::Arc;

use rand::Rng;
use tokio::sync::oneshot;

use crate::chain::ChainAdapter;
use crate::error::CoreError;
use crate::model::{Session, SessionConfig};
use crate::store::{SessionHandle, SessionStore};
use crate::transport::Role;
use crate::CoreResult;

/// Characters used for generated PINs: digits and uppercase letters, with
/// visually ambiguous characters (`0`, `O`, `1`, `I`) removed.
const PIN_ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

pub fn generate_pin(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| PIN_ALPHABET[rng.gen_range(0..PIN_ALPHABET.len())] as char)
        .collect()
}

#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    chain: Arc<dyn ChainAdapter>,
    default_pin_length: usize,
    default_timeout_ms: u64,
    grace_period_ms: u64,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        chain: Arc<dyn ChainAdapter>,
        default_pin_length: usize,
        default_timeout_ms: u64,
        grace_period_ms: u64,
    ) -> Self {
        Self { store, chain, default_pin_length, default_timeout_ms, grace_period_ms }
    }

    pub fn default_timeout_ms(&self) -> u64 {
        self.default_timeout_ms
    }

    /// Create a new session and its actor task (spec §6.1 `CREATE_SESSION`).
    /// Returns the generated PIN alongside the session id so the caller
    /// (coordinator route) can compose the connection string.
    pub fn create_session(&self, config: SessionConfig) -> CoreResult<(crate::model::SessionId, String)> {
        config.validate()?;

        let pin = config.pin.clone().unwrap_or_else(|| generate_pin(self.default_pin_length));
        let session_id = crate::model::SessionId::new();
        let session = Session::new(session_id, &config, pin.clone());

        let sender = actor::spawn(session, self.chain.clone(), self.grace_period_ms);
        self.store
            .register(SessionHandle { session_id, sender })
            .map_err(|_| CoreError::Internal("session id collision".into()))?;

        Ok((session_id, pin))
    }

    async fn dispatch<T>(
        &self,
        session_id: crate::model::SessionId,
        build: impl FnOnce(oneshot::Sender<CoreResult<T>>) -> SessionCommand,
    ) -> CoreResult<T> {
        let handle = self.store.get(session_id).ok_or(CoreError::UnknownSession)?;
        let (tx, rx) = oneshot::channel();
        handle
            .sender
            .send(build(tx))
            .await
            .map_err(|_| CoreError::UnknownSession)?;
        rx.await.map_err(|_| CoreError::UnknownSession)?
    }

    pub async fn authenticate(
        &self,
        session_id: crate::model::SessionId,
        pin: String,
        role: Role,
        label: Option<String>,
        subscription: crate::model::Subscription,
    ) -> CoreResult<AuthReply> {
        self.dispatch(session_id, |reply| SessionCommand::Authenticate {
            pin,
            role,
            label,
            subscription,
            reply,
        })
        .await
    }

    pub async fn inject_transaction(
        &self,
        session_id: crate::model::SessionId,
        frozen: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> CoreResult<crate::decoder::DecodedTransaction> {
        self.dispatch(session_id, |reply| SessionCommand::InjectTransaction { frozen, metadata, reply })
            .await
    }

    pub async fn participant_ready(
        &self,
        session_id: crate::model::SessionId,
        participant_id: crate::model::ParticipantId,
        public_key: String,
    ) -> CoreResult<()> {
        self.dispatch(session_id, |reply| SessionCommand::ParticipantReady {
            participant_id,
            public_key,
            reply,
        })
        .await
    }

    pub async fn signature_submit(
        &self,
        session_id: crate::model::SessionId,
        participant_id: crate::model::ParticipantId,
        public_key: String,
        signature: crate::model::SignaturePayload,
    ) -> CoreResult<SignatureOutcome> {
        self.dispatch(session_id, |reply| SessionCommand::SignatureSubmit {
            participant_id,
            public_key,
            signature,
            reply,
        })
        .await
    }

    pub async fn participant_reject(
        &self,
        session_id: crate::model::SessionId,
        participant_id: crate::model::ParticipantId,
        reason: String,
    ) -> CoreResult<()> {
        self.dispatch(session_id, |reply| SessionCommand::ParticipantReject {
            participant_id,
            reason,
            reply,
        })
        .await
    }

    pub async fn cancel(&self, session_id: crate::model::SessionId, reason: String) -> CoreResult<()> {
        self.dispatch(session_id, |reply| SessionCommand::Cancel { reason, reply }).await
    }

    /// Best-effort notification; a disconnect never fails the caller.
    pub async fn disconnect(&self, session_id: crate::model::SessionId, participant_id: crate::model::ParticipantId) {
        if let Some(handle) = self.store.get(session_id) {
            let _ = handle.sender.send(SessionCommand::Disconnect { participant_id }).await;
        }
    }

    /// Called by the expiry scheduler (spec §4.6) once per sweep interval.
    /// Fans `CheckExpiry` out to every live actor; reaching a terminal state
    /// does not end the actor task, so [`Self::status`] stays queryable
    /// through the grace period that follows.
    pub async fn sweep_expired(&self) -> usize {
        let handles = self.store.list_active();
        let count = handles.len();
        for handle in handles {
            let _ = handle.sender.send(SessionCommand::CheckExpiry).await;
        }
        count
    }

    /// Current status and, once terminal, the instant its grace period
    /// elapses and it becomes eligible for removal. `None` if the session no
    /// longer has a reachable actor.
    pub async fn status(
        &self,
        session_id: crate::model::SessionId,
    ) -> Option<(crate::model::SessionStatus, Option<chrono::DateTime<chrono::Utc>>)> {
        let handle = self.store.get(session_id)?;
        let (tx, rx) = oneshot::channel();
        handle.sender.send(SessionCommand::GetStatus { reply: tx }).await.ok()?;
        rx.await.ok()
    }

    /// Ends a terminal session's actor task once its grace period has
    /// elapsed (spec §4.1) and drops its handle from the store.
    pub async fn retire(&self, session_id: crate::model::SessionId) {
        if let Some(handle) = self.store.get(session_id) {
            let _ = handle.sender.send(SessionCommand::Shutdown).await;
        }
        self.store.remove(session_id);
    }

    pub fn remove(&self, session_id: crate::model::SessionId) {
        self.store.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::StubChainAdapter;
    use crate::store::InMemorySessionStore;

    fn manager() -> SessionManager {
        SessionManager::new(
            Arc::new(InMemorySessionStore::new()),
            Arc::new(StubChainAdapter::new()),
            6,
            60_000,
            300_000,
        )
    }

    fn cfg() -> SessionConfig {
        SessionConfig {
            threshold: 2,
            eligible_public_keys: vec![],
            expected_participants: 3,
            timeout_ms: 60_000,
            pin: None,
            contract_interface: None,
        }
    }

    #[test]
    fn generated_pins_avoid_ambiguous_characters() {
        let pin = generate_pin(8);
        assert_eq!(pin.len(), 8);
        assert!(pin.chars().all(|c| PIN_ALPHABET.contains(&(c as u8))));
    }

    #[tokio::test]
    async fn create_session_registers_a_reachable_actor() {
        let mgr = manager();
        let (session_id, pin) = mgr.create_session(cfg()).unwrap();
        assert_eq!(pin.len(), 6);

        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let reply = mgr
            .authenticate(session_id, pin, Role::Coordinator, None, tx)
            .await
            .unwrap();
        assert!(matches!(reply.outcome, AuthOutcome::Coordinator));
    }

    #[tokio::test]
    async fn wrong_pin_is_rejected() {
        let mgr = manager();
        let (session_id, _pin) = mgr.create_session(cfg()).unwrap();
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let err = mgr
            .authenticate(session_id, "000000".into(), Role::Coordinator, None, tx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "wrong-pin");
    }

    #[tokio::test]
    async fn unknown_session_is_rejected() {
        let mgr = manager();
        let (tx, _rx) = tokio::sync::mpsc::channel(4);
        let err = mgr
            .authenticate(crate::model::SessionId::new(), "x".into(), Role::Participant, None, tx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unknown-session");
    }
}
