//! Transaction Decoder (spec §4.2): translates an opaque frozen transaction
//! blob into a structured, reviewable view, pure and deterministic (P6).

pub mod metadata;
pub mod selector;
pub mod types;

pub use metadata::{validate_metadata, Metadata, MetadataValidation, Mismatch};
pub use selector::{verify_selector, SelectorError};
pub use types::{DecodedTransaction, TransactionDetails, TransferLine};

use sha2::{Digest, Sha256};

use crate::chain::{ChainAdapter, ChainError, FunctionSignature, RawKind, RawTransaction};

#[derive(Debug, Clone, thiserror::Error)]
pub enum DecodeError {
    #[error("decode-error: {0}")]
    ChainAdapter(String),
    #[error("decode-error: selector-mismatch")]
    SelectorMismatch,
}

impl From<ChainError> for DecodeError {
    fn from(e: ChainError) -> Self {
        Self::ChainAdapter(e.to_string())
    }
}

/// Decode `frozen` bytes into a [`DecodedTransaction`]. Pure given a fixed
/// `adapter` implementation: same bytes in, same structured view and
/// checksum out (P6).
pub fn decode(
    adapter: &dyn ChainAdapter,
    frozen: &[u8],
    contract_interface: Option<&[FunctionSignature]>,
) -> Result<DecodedTransaction, DecodeError> {
    let raw = adapter.decode(frozen)?;
    let checksum = hex::encode(Sha256::digest(frozen));
    let details = build_details(&raw, contract_interface)?;

    Ok(DecodedTransaction {
        checksum,
        transaction_id: raw.transaction_id.clone(),
        node_account_ids: raw.node_account_ids.clone(),
        max_fee: raw.max_fee,
        memo: raw.memo.clone(),
        valid_start_unix: raw.valid_start_unix,
        valid_duration_seconds: raw.valid_duration_seconds,
        expires_at_unix: raw.expires_at_unix(),
        details,
    })
}

fn build_details(
    raw: &RawTransaction,
    contract_interface: Option<&[FunctionSignature]>,
) -> Result<TransactionDetails, DecodeError> {
    let details = match raw.kind {
        RawKind::Transfer => TransactionDetails::Transfer {
            transfers: raw.transfers.iter().map(Into::into).collect(),
        },
        RawKind::TokenAssociate => TransactionDetails::TokenAssociate {
            account_id: raw.entity_id.clone(),
        },
        RawKind::TokenMint => TransactionDetails::TokenMint {
            token_id: raw.entity_id.clone(),
        },
        RawKind::ContractExecute => {
            let gas = raw.gas.unwrap_or(0);
            let payable_amount = raw.payable_amount.unwrap_or(0);
            let function_params = raw.function_params.clone().unwrap_or_default();

            let (function_name, selector_verified) = match contract_interface {
                Some(interface) if !interface.is_empty() => {
                    match verify_selector(&function_params, interface) {
                        Ok(m) => (Some(m.function_name), true),
                        Err(selector::SelectorError::Mismatch) => {
                            return Err(DecodeError::SelectorMismatch)
                        }
                        Err(selector::SelectorError::TooShort) => (None, false),
                    }
                }
                _ => (None, false),
            };

            TransactionDetails::ContractExecute {
                contract_id: raw.contract_id.clone(),
                gas,
                payable_amount,
                function_name,
                function_params,
                selector_verified,
            }
        }
        RawKind::ContractCreate => TransactionDetails::ContractCreate {
            gas: raw.gas.unwrap_or(0),
        },
        RawKind::AccountCreate => TransactionDetails::AccountCreate,
        RawKind::AccountUpdate => TransactionDetails::AccountUpdate {
            account_id: raw.entity_id.clone(),
        },
        RawKind::AccountDelete => TransactionDetails::AccountDelete {
            account_id: raw.entity_id.clone(),
        },
        RawKind::TopicCreate => TransactionDetails::TopicCreate,
        RawKind::TopicMessageSubmit => TransactionDetails::TopicMessageSubmit {
            topic_id: raw.entity_id.clone(),
        },
        RawKind::FileCreate => TransactionDetails::FileCreate,
        RawKind::FileUpdate => TransactionDetails::FileUpdate {
            file_id: raw.entity_id.clone(),
        },
        RawKind::ScheduleCreate => TransactionDetails::ScheduleCreate,
        RawKind::Unknown => TransactionDetails::Unknown,
    };

    Ok(details)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{RawTransferLine, StubChainAdapter};

    fn raw_transfer() -> RawTransaction {
        RawTransaction {
            kind: RawKind::Transfer,
            transaction_id: "0.0.1234@1700000000.000000000".to_string(),
            node_account_ids: vec!["0.0.3".to_string()],
            max_fee: 100_000_000,
            memo: "payment".to_string(),
            valid_start_unix: 1_700_000_000,
            valid_duration_seconds: 120,
            transfers: vec![
                RawTransferLine {
                    account_id: "0.0.100".to_string(),
                    signed_amount: -100,
                    token_id: None,
                    serial: None,
                },
                RawTransferLine {
                    account_id: "0.0.200".to_string(),
                    signed_amount: 100,
                    token_id: None,
                    serial: None,
                },
            ],
            contract_id: None,
            gas: None,
            payable_amount: None,
            function_params: None,
            entity_id: None,
        }
    }

    #[test]
    fn decode_is_deterministic() {
        let adapter = StubChainAdapter::new();
        let frozen = StubChainAdapter::encode(&raw_transfer());
        let a = decode(&adapter, &frozen, None).unwrap();
        let b = decode(&adapter, &frozen, None).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.checksum.len(), 64);
    }

    #[test]
    fn decode_builds_transfer_details() {
        let adapter = StubChainAdapter::new();
        let frozen = StubChainAdapter::encode(&raw_transfer());
        let decoded = decode(&adapter, &frozen, None).unwrap();
        assert_eq!(decoded.kind_name(), "transfer");
        match decoded.details {
            TransactionDetails::Transfer { transfers } => assert_eq!(transfers.len(), 2),
            _ => panic!("expected transfer"),
        }
    }

    #[test]
    fn decode_fails_on_selector_mismatch() {
        let adapter = StubChainAdapter::new();
        let mut raw = raw_transfer();
        raw.kind = RawKind::ContractExecute;
        raw.contract_id = Some("0.0.500".to_string());
        raw.gas = Some(100_000);
        raw.payable_amount = Some(0);
        raw.function_params = Some(vec![0xde, 0xad, 0xbe, 0xef]);

        let frozen = StubChainAdapter::encode(&raw);
        let interface = vec![FunctionSignature {
            name: "transfer".to_string(),
            input_types: vec!["address".to_string(), "uint256".to_string()],
        }];

        let err = decode(&adapter, &frozen, Some(&interface)).unwrap_err();
        assert!(matches!(err, DecodeError::SelectorMismatch));
    }
}
