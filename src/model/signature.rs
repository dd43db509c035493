use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::ParticipantId;

/// A signature candidate as submitted by a participant: one base64 body
/// for a single-node transaction, or one per node-specific body for a
/// multi-node transaction (spec §6.2, `SIGNATURE_SUBMIT`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignaturePayload {
    Single(String),
    Multi(Vec<String>),
}

impl SignaturePayload {
    pub fn parts(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Multi(v) => v.iter().map(|s| s.as_str()).collect(),
        }
    }
}

/// A recorded, verified signature. Invariant 4 of spec §3: every stored
/// signature has `verified = true` — there is no representation for an
/// unverified one in this store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub public_key: String,
    pub signature_bytes: Vec<Vec<u8>>,
    pub participant_id: ParticipantId,
    pub received_at: DateTime<Utc>,
    pub verified: bool,
}
