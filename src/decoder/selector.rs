use sha3::{Digest, Keccak256};

use crate::chain::FunctionSignature;

/// Derive the 4-byte Solidity-ABI-style function selector for `sig`:
/// `keccak256("name(type1,type2,...)")[0..4]`.
pub fn derive_selector(sig: &FunctionSignature) -> [u8; 4] {
    let canonical = format!("{}({})", sig.name, sig.input_types.join(","));
    let digest = Keccak256::digest(canonical.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&digest[0..4]);
    out
}

/// Result of matching a contract interface's function signatures against a
/// function-parameter blob's actual selector.
pub struct SelectorMatch {
    pub function_name: String,
}

/// Spec §4.2 selector verification:
/// 1. Extract the first 4 bytes of `function_params` as the actual selector.
/// 2. Parse `interface` to find the claimed selector for each candidate.
/// 3. If none match, this is a `selector-mismatch`.
pub fn verify_selector(
    function_params: &[u8],
    interface: &[FunctionSignature],
) -> Result<SelectorMatch, SelectorError> {
    if function_params.len() < 4 {
        return Err(SelectorError::TooShort);
    }
    let actual = &function_params[0..4];

    for sig in interface {
        let claimed = derive_selector(sig);
        if claimed == actual {
            return Ok(SelectorMatch {
                function_name: sig.name.clone(),
            });
        }
    }

    Err(SelectorError::Mismatch)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("function parameters too short to contain a selector")]
    TooShort,
    #[error("selector-mismatch")]
    Mismatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_known_selector() {
        // transfer(address,uint256) -> 0xa9059cbb (well-known ERC-20 selector)
        let sig = FunctionSignature {
            name: "transfer".to_string(),
            input_types: vec!["address".to_string(), "uint256".to_string()],
        };
        assert_eq!(derive_selector(&sig), [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn verify_selector_matches_correct_signature() {
        let sig = FunctionSignature {
            name: "transfer".to_string(),
            input_types: vec!["address".to_string(), "uint256".to_string()],
        };
        let mut params = vec![0xa9, 0x05, 0x9c, 0xbb];
        params.extend_from_slice(&[0u8; 32]);
        let result = verify_selector(&params, std::slice::from_ref(&sig)).unwrap();
        assert_eq!(result.function_name, "transfer");
    }

    #[test]
    fn verify_selector_rejects_mismatch() {
        let sig = FunctionSignature {
            name: "transfer".to_string(),
            input_types: vec!["address".to_string(), "uint256".to_string()],
        };
        let params = vec![0xde, 0xad, 0xbe, 0xef, 0, 0];
        let err = verify_selector(&params, std::slice::from_ref(&sig)).unwrap_err();
        assert_eq!(err, SelectorError::Mismatch);
    }
}
