use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{DecodedTransaction, TransactionDetails};

/// Coordinator-supplied, unverified annotations attached at injection time
/// (spec §3 `metadata`, §4.2 `MetadataValidation`).
pub type Metadata = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mismatch {
    pub field: &'static str,
    pub metadata: String,
    pub actual: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataValidation {
    pub warnings: Vec<String>,
    pub mismatches: Vec<Mismatch>,
    pub valid: bool,
}

const URGENCY_WORDS: &[&str] = &[
    "urgent",
    "immediately",
    "asap",
    "hurry",
    "quickly",
    "now",
    "emergency",
];

fn urgency_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let alternation = URGENCY_WORDS.join("|");
        Regex::new(&format!(r"(?i)\b({alternation})\b")).unwrap()
    })
}

/// Tolerates a small set of common aliases for the canonical kind names
/// (spec §4.2: `"HBAR Transfer" ≡ transfer`).
fn normalize_type_alias(s: &str) -> String {
    let lower = s.to_lowercase();
    let squashed: String = lower
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect();
    match squashed.as_str() {
        "hbar-transfer" | "crypto-transfer" | "transfer" => "transfer".to_string(),
        other => other.to_string(),
    }
}

fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse::<f64>().ok()
}

fn decoded_accounts(tx: &DecodedTransaction) -> Vec<String> {
    match &tx.details {
        TransactionDetails::Transfer { transfers } => {
            transfers.iter().map(|t| t.account_id.clone()).collect()
        }
        TransactionDetails::TokenAssociate { account_id }
        | TransactionDetails::AccountUpdate { account_id }
        | TransactionDetails::AccountDelete { account_id } => {
            account_id.iter().cloned().collect()
        }
        TransactionDetails::ContractExecute { contract_id, .. } => {
            contract_id.iter().cloned().collect()
        }
        _ => Vec::new(),
    }
}

fn decoded_amount(tx: &DecodedTransaction) -> Option<f64> {
    match &tx.details {
        TransactionDetails::Transfer { transfers } => transfers
            .iter()
            .map(|t| t.signed_amount.unsigned_abs())
            .max()
            .map(|v| v as f64),
        _ => None,
    }
}

/// Validate coordinator-supplied metadata against the decoded truth
/// (spec §4.2). `metadata` may carry arbitrary keys; only the keys this
/// function recognizes participate in mismatch detection, but every string
/// value is scanned for urgency language.
pub fn validate_metadata(tx: &DecodedTransaction, metadata: &Metadata) -> MetadataValidation {
    let mut warnings = Vec::new();
    let mut mismatches = Vec::new();

    for value in metadata.values() {
        scan_for_urgency(value, &mut warnings);
    }

    if let Some(Value::String(claimed_type)) = metadata.get("type") {
        let claimed = normalize_type_alias(claimed_type);
        let actual = tx.kind_name().to_string();
        if claimed != actual {
            mismatches.push(Mismatch {
                field: "type",
                metadata: claimed_type.clone(),
                actual,
            });
        }
    }

    if let Some(amount_val) = metadata.get("amount") {
        if let Some(claimed) = value_as_amount_string(amount_val) {
            if let (Some(claimed_num), Some(actual_num)) =
                (parse_amount(&claimed), decoded_amount(tx))
            {
                if (claimed_num.abs() - actual_num.abs()).abs() > 1e-4 {
                    mismatches.push(Mismatch {
                        field: "amount",
                        metadata: claimed,
                        actual: actual_num.to_string(),
                    });
                }
            }
        }
    }

    if let Some(Value::Array(accounts)) = metadata.get("accounts") {
        let actual = decoded_accounts(tx);
        let claimed: Vec<String> = accounts
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        let missing: Vec<&String> = claimed.iter().filter(|c| !actual.contains(c)).collect();
        if !missing.is_empty() {
            mismatches.push(Mismatch {
                field: "accounts",
                metadata: claimed.join(","),
                actual: actual.join(","),
            });
        }
    }

    if let TransactionDetails::ContractExecute { function_name, .. } = &tx.details {
        if let Some(Value::String(claimed_fn)) = metadata.get("function_name") {
            let actual = function_name.clone().unwrap_or_default();
            if claimed_fn != &actual {
                mismatches.push(Mismatch {
                    field: "function_name",
                    metadata: claimed_fn.clone(),
                    actual,
                });
            }
        }
    }

    let valid = mismatches.is_empty();
    MetadataValidation {
        warnings,
        mismatches,
        valid,
    }
}

fn value_as_amount_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scan_for_urgency(value: &Value, warnings: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            if let Some(m) = urgency_regex().find(s) {
                warnings.push(format!("urgency language detected: \"{}\"", m.as_str()));
            }
        }
        Value::Array(items) => {
            for item in items {
                scan_for_urgency(item, warnings);
            }
        }
        Value::Object(map) => {
            for v in map.values() {
                scan_for_urgency(v, warnings);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::types::TransferLine;

    fn sample_transfer_tx() -> DecodedTransaction {
        DecodedTransaction {
            checksum: "abc".to_string(),
            transaction_id: "0.0.1@1.0".to_string(),
            node_account_ids: vec!["0.0.3".to_string()],
            max_fee: 1,
            memo: String::new(),
            valid_start_unix: 0,
            valid_duration_seconds: 120,
            expires_at_unix: 120,
            details: TransactionDetails::Transfer {
                transfers: vec![
                    TransferLine {
                        account_id: "0.0.100".to_string(),
                        signed_amount: -100,
                        token_id: None,
                        serial: None,
                    },
                    TransferLine {
                        account_id: "0.0.200".to_string(),
                        signed_amount: 100,
                        token_id: None,
                        serial: None,
                    },
                ],
            },
        }
    }

    fn meta(json: serde_json::Value) -> Metadata {
        match json {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn detects_urgency_language() {
        let tx = sample_transfer_tx();
        let metadata = meta(serde_json::json!({"note": "please approve ASAP"}));
        let result = validate_metadata(&tx, &metadata);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn type_alias_is_tolerated() {
        let tx = sample_transfer_tx();
        let metadata = meta(serde_json::json!({"type": "HBAR Transfer"}));
        let result = validate_metadata(&tx, &metadata);
        assert!(result.valid);
        assert!(result.mismatches.is_empty());
    }

    #[test]
    fn type_mismatch_is_flagged() {
        let tx = sample_transfer_tx();
        let metadata = meta(serde_json::json!({"type": "token-mint"}));
        let result = validate_metadata(&tx, &metadata);
        assert!(!result.valid);
        assert_eq!(result.mismatches[0].field, "type");
    }

    #[test]
    fn amount_within_tolerance_passes() {
        let tx = sample_transfer_tx();
        let metadata = meta(serde_json::json!({"amount": "$100.00001"}));
        let result = validate_metadata(&tx, &metadata);
        assert!(result.valid);
    }

    #[test]
    fn amount_mismatch_is_flagged() {
        let tx = sample_transfer_tx();
        let metadata = meta(serde_json::json!({"amount": "50"}));
        let result = validate_metadata(&tx, &metadata);
        assert!(!result.valid);
        assert_eq!(result.mismatches[0].field, "amount");
    }

    #[test]
    fn missing_account_is_flagged() {
        let tx = sample_transfer_tx();
        let metadata = meta(serde_json::json!({"accounts": ["0.0.999"]}));
        let result = validate_metadata(&tx, &metadata);
        assert!(!result.valid);
        assert_eq!(result.mismatches[0].field, "accounts");
    }
}
