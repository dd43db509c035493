//! Connection-string codec (spec §6.5): `hmsc:<base64url(json)>`, the
//! single artifact a coordinator hands a participant out of band (QR code,
//! copy-pasted link) to join a session.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::model::SessionId;

const PREFIX: &str = "hmsc:";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct ConnStrPayload {
    /// Server URL the participant should dial to reach the coordinator.
    s: String,
    /// Session id, hex-encoded.
    i: String,
    /// Optional session PIN. Absent when the session requires none.
    #[serde(skip_serializing_if = "Option::is_none")]
    p: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnStrError {
    #[error("missing hmsc: prefix")]
    MissingPrefix,
    #[error("malformed base64")]
    MalformedBase64,
    #[error("malformed payload")]
    MalformedPayload,
}

pub fn encode(server_url: &str, session_id: SessionId, pin: Option<&str>) -> String {
    let payload = ConnStrPayload {
        s: server_url.to_string(),
        i: session_id.to_string(),
        p: pin.map(str::to_string),
    };
    let json = serde_json::to_vec(&payload).expect("connection string payload always serializes");
    format!("{PREFIX}{}", base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json))
}

pub fn decode(connection_string: &str) -> Result<(String, SessionId, Option<String>), ConnStrError> {
    let body = connection_string.strip_prefix(PREFIX).ok_or(ConnStrError::MissingPrefix)?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(body)
        .map_err(|_| ConnStrError::MalformedBase64)?;

    // Reject unknown keys (spec P7): deserialize into a permissive map first
    // and check its key set before decoding into the strict struct.
    let raw: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|_| ConnStrError::MalformedPayload)?;
    let obj = raw.as_object().ok_or(ConnStrError::MalformedPayload)?;
    const KNOWN: &[&str] = &["s", "i", "p"];
    if obj.keys().any(|k| !KNOWN.contains(&k.as_str())) {
        return Err(ConnStrError::MalformedPayload);
    }

    let payload: ConnStrPayload = serde_json::from_value(raw).map_err(|_| ConnStrError::MalformedPayload)?;
    let session_id = SessionId::parse(&payload.i).ok_or(ConnStrError::MalformedPayload)?;
    Ok((payload.s, session_id, payload.p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let session_id = SessionId::new();
        let encoded = encode("https://example.test", session_id, Some("ABC123"));
        assert!(encoded.starts_with(PREFIX));
        let (server_url, decoded_id, pin) = decode(&encoded).unwrap();
        assert_eq!(server_url, "https://example.test");
        assert_eq!(decoded_id, session_id);
        assert_eq!(pin.as_deref(), Some("ABC123"));
    }

    #[test]
    fn pin_is_optional() {
        let session_id = SessionId::new();
        let encoded = encode("https://example.test", session_id, None);
        let (_, _, pin) = decode(&encoded).unwrap();
        assert!(pin.is_none());
    }

    #[test]
    fn rejects_missing_prefix() {
        assert_eq!(decode("not-a-connection-string").unwrap_err(), ConnStrError::MissingPrefix);
    }

    #[test]
    fn rejects_malformed_base64() {
        assert_eq!(decode("hmsc:not base64!!").unwrap_err(), ConnStrError::MalformedBase64);
    }

    #[test]
    fn rejects_unknown_keys() {
        let json = serde_json::json!({"s": "https://example.test", "i": "00112233445566778899aabbccddeeff", "z": "unexpected"});
        let body = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json).unwrap());
        assert_eq!(decode(&format!("hmsc:{body}")).unwrap_err(), ConnStrError::MalformedPayload);
    }

    #[test]
    fn rejects_missing_required_keys() {
        let json = serde_json::json!({"s": "https://example.test"});
        let body = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json).unwrap());
        assert_eq!(decode(&format!("hmsc:{body}")).unwrap_err(), ConnStrError::MalformedPayload);
    }
}
