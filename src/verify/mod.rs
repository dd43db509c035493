//! Signature Verifier (spec §4.3): cryptographically verifies a candidate
//! signature against the frozen transaction and the claimed public key
//! before any acceptance. Never touches private keys.

use ed25519_dalek::Verifier as _;
use k256::ecdsa::signature::Verifier as _;

use crate::chain::ChainAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("malformed-key")]
    MalformedKey,
    #[error("malformed-signature")]
    MalformedSignature,
    #[error("wrong-count")]
    WrongCount,
    #[error("verification-failed")]
    VerificationFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Ed25519,
    Secp256k1,
}

/// Infer the key type from its hex encoding: a bare 32-byte value is
/// Ed25519; a 33-byte SEC1-compressed value (leading `0x02`/`0x03`) is
/// secp256k1.
fn infer_key_kind(key_bytes: &[u8]) -> Result<KeyKind, VerifyError> {
    match key_bytes.len() {
        32 => Ok(KeyKind::Ed25519),
        33 if key_bytes[0] == 0x02 || key_bytes[0] == 0x03 => Ok(KeyKind::Secp256k1),
        _ => Err(VerifyError::MalformedKey),
    }
}

fn verify_one(kind: KeyKind, key_bytes: &[u8], message: &[u8], sig_bytes: &[u8]) -> Result<(), VerifyError> {
    match kind {
        KeyKind::Ed25519 => {
            let key_arr: [u8; 32] = key_bytes.try_into().map_err(|_| VerifyError::MalformedKey)?;
            let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&key_arr)
                .map_err(|_| VerifyError::MalformedKey)?;
            let sig_arr: [u8; 64] = sig_bytes
                .try_into()
                .map_err(|_| VerifyError::MalformedSignature)?;
            let signature = ed25519_dalek::Signature::from_bytes(&sig_arr);
            verifying_key
                .verify(message, &signature)
                .map_err(|_| VerifyError::VerificationFailed)
        }
        KeyKind::Secp256k1 => {
            let verifying_key = k256::ecdsa::VerifyingKey::from_sec1_bytes(key_bytes)
                .map_err(|_| VerifyError::MalformedKey)?;
            let signature = k256::ecdsa::Signature::from_slice(sig_bytes)
                .map_err(|_| VerifyError::MalformedSignature)?;
            verifying_key
                .verify(message, &signature)
                .map_err(|_| VerifyError::VerificationFailed)
        }
    }
}

/// Verify `signature_parts` (one entry for single-node transactions, one
/// per node-specific body for multi-node transactions) against `frozen`
/// under `public_key_hex`. Every part must verify; a partial match fails
/// (spec §4.3).
pub async fn verify(
    adapter: &dyn ChainAdapter,
    frozen: &[u8],
    public_key_hex: &str,
    signature_parts: &[Vec<u8>],
) -> Result<(), VerifyError> {
    let key_bytes = hex::decode(public_key_hex).map_err(|_| VerifyError::MalformedKey)?;
    let kind = infer_key_kind(&key_bytes)?;

    let node_count = frozen_node_count(adapter, frozen);
    if node_count > 1 && signature_parts.len() != node_count {
        return Err(VerifyError::WrongCount);
    }

    if signature_parts.is_empty() {
        return Err(VerifyError::MalformedSignature);
    }

    for (idx, sig_bytes) in signature_parts.iter().enumerate() {
        let node_index = if node_count > 1 { Some(idx) } else { None };
        let message = adapter
            .signing_bytes(frozen, node_index)
            .map_err(|_| VerifyError::VerificationFailed)?;
        verify_one(kind, &key_bytes, &message, sig_bytes)?;
    }

    Ok(())
}

fn frozen_node_count(adapter: &dyn ChainAdapter, frozen: &[u8]) -> usize {
    adapter
        .decode(frozen)
        .map(|raw| raw.node_account_ids.len().max(1))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{RawKind, RawTransaction, StubChainAdapter};
    use ed25519_dalek::Signer as _;

    fn raw_single_node() -> RawTransaction {
        RawTransaction {
            kind: RawKind::Transfer,
            transaction_id: "0.0.1@1.0".to_string(),
            node_account_ids: vec!["0.0.3".to_string()],
            max_fee: 1,
            memo: String::new(),
            valid_start_unix: 0,
            valid_duration_seconds: 120,
            transfers: vec![],
            contract_id: None,
            gas: None,
            payable_amount: None,
            function_params: None,
            entity_id: None,
        }
    }

    #[tokio::test]
    async fn ed25519_valid_signature_verifies() {
        let adapter = StubChainAdapter::new();
        let frozen = StubChainAdapter::encode(&raw_single_node());

        let mut csprng = rand::rngs::OsRng;
        let signing_key = ed25519_dalek::SigningKey::generate(&mut csprng);
        let message = adapter.signing_bytes(&frozen, None).unwrap();
        let signature = signing_key.sign(&message);

        let pub_hex = hex::encode(signing_key.verifying_key().to_bytes());
        let result = verify(&adapter, &frozen, &pub_hex, &[signature.to_bytes().to_vec()]).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn ed25519_tampered_signature_fails() {
        let adapter = StubChainAdapter::new();
        let frozen = StubChainAdapter::encode(&raw_single_node());

        let mut csprng = rand::rngs::OsRng;
        let signing_key = ed25519_dalek::SigningKey::generate(&mut csprng);
        let message = adapter.signing_bytes(&frozen, None).unwrap();
        let mut sig_bytes = signing_key.sign(&message).to_bytes();
        sig_bytes[0] ^= 0xFF;

        let pub_hex = hex::encode(signing_key.verifying_key().to_bytes());
        let result = verify(&adapter, &frozen, &pub_hex, &[sig_bytes.to_vec()]).await;
        assert_eq!(result.unwrap_err(), VerifyError::VerificationFailed);
    }

    #[tokio::test]
    async fn malformed_key_is_rejected() {
        let adapter = StubChainAdapter::new();
        let frozen = StubChainAdapter::encode(&raw_single_node());
        let result = verify(&adapter, &frozen, "zz", &[vec![0u8; 64]]).await;
        assert_eq!(result.unwrap_err(), VerifyError::MalformedKey);
    }

    #[tokio::test]
    async fn secp256k1_valid_signature_verifies() {
        let adapter = StubChainAdapter::new();
        let frozen = StubChainAdapter::encode(&raw_single_node());

        let signing_key = k256::ecdsa::SigningKey::random(&mut rand::rngs::OsRng);
        let message = adapter.signing_bytes(&frozen, None).unwrap();
        let signature: k256::ecdsa::Signature = {
            use k256::ecdsa::signature::Signer;
            signing_key.sign(&message)
        };

        let verifying_key = signing_key.verifying_key();
        let pub_hex = hex::encode(verifying_key.to_sec1_bytes());
        let result = verify(&adapter, &frozen, &pub_hex, &[signature.to_bytes().to_vec()]).await;
        assert!(result.is_ok());
    }
}
