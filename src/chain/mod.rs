//! Chain Adapter (spec §6.4).
//!
//! The core's sole dependency on the blockchain network. Freezing,
//! byte-layout, node selection, the signature-map layout, and submission
//! are all opaque behind this trait — the rest of the crate never reaches
//! into a frozen transaction's bytes directly.
//!
//! [`StubChainAdapter`] is the reference implementation used by this crate's
//! own tests and as the default when no production adapter is wired in. It
//! defines its own small, deterministic wire format for "frozen transaction
//! bytes" ([`RawTransaction`] serialized with `serde_json`) since a real
//! deployment substitutes a network-backed adapter built on the actual
//! chain SDK, which is out of scope here (spec §1).

mod stub;

pub use stub::StubChainAdapter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The low-level kind tag the Chain Adapter attaches to a decoded
/// transaction. The Decoder (`crate::decoder`) dispatches on this tag to
/// build the corresponding [`crate::decoder::DecodedTransaction`] variant,
/// per the "dynamic dispatch over transaction kinds" design note (spec §9):
/// dispatch happens on this tag, never on host-language class identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawKind {
    Transfer,
    TokenAssociate,
    TokenMint,
    ContractExecute,
    ContractCreate,
    AccountCreate,
    AccountUpdate,
    AccountDelete,
    TopicCreate,
    TopicMessageSubmit,
    FileCreate,
    FileUpdate,
    ScheduleCreate,
    Unknown,
}

/// A single (account, signed amount, optional token/serial) transfer line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransferLine {
    pub account_id: String,
    pub signed_amount: i64,
    pub token_id: Option<String>,
    pub serial: Option<i64>,
}

/// Raw fields the Chain Adapter extracts from a frozen transaction, common
/// to every kind plus the kind-specific payload. This is the "low-level
/// kind tag" carrier referenced above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTransaction {
    pub kind: RawKind,
    pub transaction_id: String,
    pub node_account_ids: Vec<String>,
    pub max_fee: u64,
    pub memo: String,
    pub valid_start_unix: i64,
    pub valid_duration_seconds: i64,

    // transfer
    pub transfers: Vec<RawTransferLine>,

    // contract-execute / contract-create
    pub contract_id: Option<String>,
    pub gas: Option<u64>,
    pub payable_amount: Option<u64>,
    /// Raw function-parameter blob: first 4 bytes are the actual selector.
    pub function_params: Option<Vec<u8>>,

    // generic single-entity kinds (token/account/topic/file/schedule)
    pub entity_id: Option<String>,
}

impl RawTransaction {
    pub fn expires_at_unix(&self) -> i64 {
        self.valid_start_unix + self.valid_duration_seconds
    }
}

/// One function signature entry in a contract-interface description, used
/// to verify a contract-execute transaction's function selector (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub input_types: Vec<String>,
}

/// Classified submission failures (spec §4.4 "Failure semantics").
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError {
    #[error("transient chain error: {0}")]
    Transient(String),
    #[error("transaction validity window has expired")]
    ValidityWindowExpired,
    #[error("insufficient signatures presented to the network")]
    InsufficientSignatures,
    #[error("chain error: {0}")]
    Other(String),
}

/// Receipt summary returned on successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReceipt {
    pub transaction_id: String,
    pub status: String,
    pub consensus_timestamp: Option<String>,
}

/// The core's sole dependency on the blockchain network (spec §6.4).
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Parse frozen bytes into their raw, low-level fields. The Decoder
    /// wraps this to build a typed [`crate::decoder::DecodedTransaction`].
    fn decode(&self, frozen: &[u8]) -> Result<RawTransaction, ChainError>;

    /// The canonical bytes a signer must sign for the single-node case, or
    /// for node index `node_index` in the multi-node case.
    fn signing_bytes(&self, frozen: &[u8], node_index: Option<usize>) -> Result<Vec<u8>, ChainError>;

    /// Attach a verified signature (or per-node list) under `public_key` to
    /// the frozen transaction, returning the updated bytes.
    async fn attach_signature(
        &self,
        frozen: &[u8],
        public_key: &str,
        signature: &[Vec<u8>],
    ) -> Result<Vec<u8>, ChainError>;

    /// Submit the fully-signed transaction to the network.
    async fn submit(&self, frozen_with_all_sigs: &[u8]) -> Result<ExecutionReceipt, ChainError>;
}
