use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{ChainAdapter, ChainError, ExecutionReceipt, RawTransaction};

/// Reference [`ChainAdapter`] used by this crate's own tests and as the
/// default when no production network adapter is configured.
///
/// Frozen bytes are `serde_json`-encoded [`RawTransaction`] values. Signing
/// bytes are the SHA-256 digest of the frozen bytes (optionally
/// domain-separated by node index for multi-node transactions) — a stand-in
/// for the chain SDK's real canonical signing-bytes computation, which is
/// out of scope (spec §1, §6.4).
#[derive(Debug, Default)]
pub struct StubChainAdapter {
    /// When set, `submit` always returns this error — used to simulate
    /// transient/validity-window/insufficient-signature failures in tests.
    pub force_submit_error: Option<fn() -> ChainError>,
}

impl StubChainAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn encode(raw: &RawTransaction) -> Vec<u8> {
        serde_json::to_vec(raw).expect("RawTransaction always serializes")
    }
}

#[async_trait]
impl ChainAdapter for StubChainAdapter {
    fn decode(&self, frozen: &[u8]) -> Result<RawTransaction, ChainError> {
        serde_json::from_slice(frozen)
            .map_err(|e| ChainError::Other(format!("malformed frozen transaction: {e}")))
    }

    fn signing_bytes(&self, frozen: &[u8], node_index: Option<usize>) -> Result<Vec<u8>, ChainError> {
        let mut hasher = Sha256::new();
        hasher.update(frozen);
        if let Some(idx) = node_index {
            hasher.update(b"node:");
            hasher.update(idx.to_le_bytes());
        }
        Ok(hasher.finalize().to_vec())
    }

    async fn attach_signature(
        &self,
        frozen: &[u8],
        _public_key: &str,
        _signature: &[Vec<u8>],
    ) -> Result<Vec<u8>, ChainError> {
        // The stub doesn't maintain a signature map; callers track
        // acceptance themselves via the Session Store. Real adapters
        // return transaction bytes with the signature map updated.
        Ok(frozen.to_vec())
    }

    async fn submit(&self, frozen_with_all_sigs: &[u8]) -> Result<ExecutionReceipt, ChainError> {
        if let Some(make_err) = self.force_submit_error {
            return Err(make_err());
        }

        let raw = self.decode(frozen_with_all_sigs)?;
        Ok(ExecutionReceipt {
            transaction_id: raw.transaction_id,
            status: "SUCCESS".to_string(),
            consensus_timestamp: Some(chrono::Utc::now().to_rfc3339()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{RawKind, RawTransferLine};

    fn sample_raw() -> RawTransaction {
        RawTransaction {
            kind: RawKind::Transfer,
            transaction_id: "0.0.1234@1700000000.000000000".to_string(),
            node_account_ids: vec!["0.0.3".to_string()],
            max_fee: 100_000_000,
            memo: "test".to_string(),
            valid_start_unix: 1_700_000_000,
            valid_duration_seconds: 120,
            transfers: vec![RawTransferLine {
                account_id: "0.0.100".to_string(),
                signed_amount: -100,
                token_id: None,
                serial: None,
            }],
            contract_id: None,
            gas: None,
            payable_amount: None,
            function_params: None,
            entity_id: None,
        }
    }

    #[tokio::test]
    async fn decode_and_submit_round_trip() {
        let adapter = StubChainAdapter::new();
        let frozen = StubChainAdapter::encode(&sample_raw());

        let decoded = adapter.decode(&frozen).unwrap();
        assert_eq!(decoded.transaction_id, "0.0.1234@1700000000.000000000");

        let receipt = adapter.submit(&frozen).await.unwrap();
        assert_eq!(receipt.transaction_id, decoded.transaction_id);
        assert_eq!(receipt.status, "SUCCESS");
    }

    #[tokio::test]
    async fn submit_surfaces_forced_errors() {
        let adapter = StubChainAdapter {
            force_submit_error: Some(|| ChainError::ValidityWindowExpired),
        };
        let frozen = StubChainAdapter::encode(&sample_raw());
        let err = adapter.submit(&frozen).await.unwrap_err();
        assert!(matches!(err, ChainError::ValidityWindowExpired));
    }

    #[test]
    fn signing_bytes_differ_per_node() {
        let adapter = StubChainAdapter::new();
        let frozen = StubChainAdapter::encode(&sample_raw());
        let a = adapter.signing_bytes(&frozen, Some(0)).unwrap();
        let b = adapter.signing_bytes(&frozen, Some(1)).unwrap();
        assert_ne!(a, b);
    }
}
