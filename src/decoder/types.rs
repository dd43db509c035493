use serde::{Deserialize, Serialize};

use crate::chain::{RawKind, RawTransferLine};

/// One transfer line in a decoded transfer transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferLine {
    pub account_id: String,
    pub signed_amount: i64,
    pub token_id: Option<String>,
    pub serial: Option<i64>,
}

impl From<&RawTransferLine> for TransferLine {
    fn from(r: &RawTransferLine) -> Self {
        Self {
            account_id: r.account_id.clone(),
            signed_amount: r.signed_amount,
            token_id: r.token_id.clone(),
            serial: r.serial,
        }
    }
}

/// Tagged variant over supported transaction kinds (spec §9 redesign note:
/// no dynamic dispatch on host-language class identity — dispatch happens
/// once, in [`super::decode`], on the Chain Adapter's [`RawKind`] tag).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TransactionDetails {
    Transfer {
        transfers: Vec<TransferLine>,
    },
    TokenAssociate {
        account_id: Option<String>,
    },
    TokenMint {
        token_id: Option<String>,
    },
    ContractExecute {
        contract_id: Option<String>,
        gas: u64,
        payable_amount: u64,
        /// `None` when selector verification failed or no interface was
        /// supplied.
        function_name: Option<String>,
        function_params: Vec<u8>,
        selector_verified: bool,
    },
    ContractCreate {
        gas: u64,
    },
    AccountCreate,
    AccountUpdate {
        account_id: Option<String>,
    },
    AccountDelete {
        account_id: Option<String>,
    },
    TopicCreate,
    TopicMessageSubmit {
        topic_id: Option<String>,
    },
    FileCreate,
    FileUpdate {
        file_id: Option<String>,
    },
    ScheduleCreate,
    Unknown,
}

impl TransactionDetails {
    /// Canonical kind name used for metadata type-alias comparison
    /// (spec §4.2: `"HBAR Transfer" ≡ transfer`).
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Transfer { .. } => "transfer",
            Self::TokenAssociate { .. } => "token-associate",
            Self::TokenMint { .. } => "token-mint",
            Self::ContractExecute { .. } => "contract-execute",
            Self::ContractCreate { .. } => "contract-create",
            Self::AccountCreate => "account-create",
            Self::AccountUpdate { .. } => "account-update",
            Self::AccountDelete { .. } => "account-delete",
            Self::TopicCreate => "topic-create",
            Self::TopicMessageSubmit { .. } => "topic-message-submit",
            Self::FileCreate => "file-create",
            Self::FileUpdate { .. } => "file-update",
            Self::ScheduleCreate => "schedule-create",
            Self::Unknown => "unknown",
        }
    }
}

impl From<RawKind> for &'static str {
    fn from(k: RawKind) -> Self {
        match k {
            RawKind::Transfer => "transfer",
            RawKind::TokenAssociate => "token-associate",
            RawKind::TokenMint => "token-mint",
            RawKind::ContractExecute => "contract-execute",
            RawKind::ContractCreate => "contract-create",
            RawKind::AccountCreate => "account-create",
            RawKind::AccountUpdate => "account-update",
            RawKind::AccountDelete => "account-delete",
            RawKind::TopicCreate => "topic-create",
            RawKind::TopicMessageSubmit => "topic-message-submit",
            RawKind::FileCreate => "file-create",
            RawKind::FileUpdate => "file-update",
            RawKind::ScheduleCreate => "schedule-create",
            RawKind::Unknown => "unknown",
        }
    }
}

/// Fully decoded, structured view of a frozen transaction (spec §4.2).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecodedTransaction {
    pub checksum: String,
    pub transaction_id: String,
    pub node_account_ids: Vec<String>,
    pub max_fee: u64,
    pub memo: String,
    pub valid_start_unix: i64,
    pub valid_duration_seconds: i64,
    pub expires_at_unix: i64,
    pub details: TransactionDetails,
}

impl DecodedTransaction {
    pub fn kind_name(&self) -> &'static str {
        self.details.kind_name()
    }
}
