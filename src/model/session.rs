use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::ids::{ParticipantId, SessionId};
use super::participant::{Participant, Subscription};
use super::signature::Signature;
use super::status::SessionStatus;
use crate::chain::FunctionSignature;
use crate::decoder::{DecodedTransaction, Metadata};

/// Configuration supplied at session creation (spec §6.1 `CREATE_SESSION`).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub threshold: u32,
    pub eligible_public_keys: Vec<String>,
    pub expected_participants: u32,
    pub timeout_ms: u64,
    pub pin: Option<String>,
    /// Function signatures for decoding and selector-verifying a
    /// contract-execute transaction injected into this session (spec §4.2).
    /// `None` when the session never expects a contract-execute kind.
    pub contract_interface: Option<Vec<FunctionSignature>>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SessionConfigError {
    #[error("threshold must be at least 1")]
    ThresholdTooLow,
    #[error("threshold cannot exceed the number of eligible keys")]
    ThresholdExceedsEligibleKeys,
    #[error("expected_participants must be at least threshold")]
    ExpectedParticipantsBelowThreshold,
}

impl SessionConfig {
    /// Invariant 6 of spec §3: `1 <= threshold <= |eligible_public_keys|`
    /// when eligible keys are enumerated; violations fail creation.
    pub fn validate(&self) -> Result<(), SessionConfigError> {
        if self.threshold < 1 {
            return Err(SessionConfigError::ThresholdTooLow);
        }
        if !self.eligible_public_keys.is_empty()
            && self.threshold as usize > self.eligible_public_keys.len()
        {
            return Err(SessionConfigError::ThresholdExceedsEligibleKeys);
        }
        if self.expected_participants < self.threshold {
            return Err(SessionConfigError::ExpectedParticipantsBelowThreshold);
        }
        Ok(())
    }
}

/// A signing session (spec §3). Owns its participant arena directly;
/// external references are always `(SessionId, ParticipantId)` pairs,
/// never pointers into this struct (spec §9 "cyclic references").
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: SessionId,
    pub pin: String,
    pub threshold: u32,
    pub eligible_public_keys: Vec<String>,
    pub expected_participants: u32,
    pub status: SessionStatus,
    pub frozen_transaction: Option<Vec<u8>>,
    pub decoded_tx: Option<DecodedTransaction>,
    pub metadata: Option<Metadata>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub transaction_received_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub participants: HashMap<ParticipantId, Participant>,
    pub signatures: HashMap<String, Signature>,
    pub coordinator_subscription: Option<Subscription>,
    /// Set once grace-period deletion has been scheduled (spec §4.1).
    pub delete_at: Option<DateTime<Utc>>,
    pub contract_interface: Option<Vec<FunctionSignature>>,
}

impl Session {
    pub fn new(session_id: SessionId, config: &SessionConfig, pin: String) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            pin,
            threshold: config.threshold,
            eligible_public_keys: config.eligible_public_keys.clone(),
            expected_participants: config.expected_participants,
            status: SessionStatus::Waiting,
            frozen_transaction: None,
            decoded_tx: None,
            metadata: None,
            created_at: now,
            expires_at: now + chrono::Duration::milliseconds(config.timeout_ms as i64),
            transaction_received_at: None,
            completed_at: None,
            participants: HashMap::new(),
            signatures: HashMap::new(),
            coordinator_subscription: None,
            delete_at: None,
            contract_interface: config.contract_interface.clone(),
        }
    }

    pub fn is_eligible(&self, public_key: &str) -> bool {
        self.eligible_public_keys.is_empty() || self.eligible_public_keys.iter().any(|k| k == public_key)
    }

    pub fn threshold_met(&self) -> bool {
        self.signatures.len() as u32 >= self.threshold
    }

    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && now >= self.expires_at
    }

    /// All connections currently subscribed to this session's broadcasts:
    /// the coordinator (if connected) and every connected participant.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let mut subs: Vec<Subscription> = self.coordinator_subscription.iter().cloned().collect();
        subs.extend(
            self.participants
                .values()
                .filter_map(|p| p.subscription.clone()),
        );
        subs
    }

    pub fn ready_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants
            .values()
            .filter(|p| matches!(p.status, super::status::ParticipantStatus::Ready | super::status::ParticipantStatus::Reviewing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(threshold: u32, keys: Vec<&str>, expected: u32) -> SessionConfig {
        SessionConfig {
            threshold,
            eligible_public_keys: keys.into_iter().map(String::from).collect(),
            expected_participants: expected,
            timeout_ms: 60_000,
            pin: None,
            contract_interface: None,
        }
    }

    #[test]
    fn rejects_threshold_below_one() {
        assert_eq!(
            cfg(0, vec!["k1"], 1).validate().unwrap_err(),
            SessionConfigError::ThresholdTooLow
        );
    }

    #[test]
    fn rejects_threshold_above_eligible_keys() {
        assert_eq!(
            cfg(3, vec!["k1", "k2"], 3).validate().unwrap_err(),
            SessionConfigError::ThresholdExceedsEligibleKeys
        );
    }

    #[test]
    fn empty_eligible_set_is_advisory_any_key() {
        assert!(cfg(2, vec![], 3).validate().is_ok());
        let session = Session::new(
            SessionId::new(),
            &cfg(2, vec![], 3),
            "123456".to_string(),
        );
        assert!(session.is_eligible("anything"));
    }

    #[test]
    fn rejects_expected_participants_below_threshold() {
        assert_eq!(
            cfg(2, vec!["k1", "k2"], 1).validate().unwrap_err(),
            SessionConfigError::ExpectedParticipantsBelowThreshold
        );
    }
}
