//! Error taxonomy. Conceptual kinds, not wire type names: Protocol, Auth,
//! Policy, Crypto, Lifecycle, Chain, Resource.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    // -- Protocol: malformed frame, unknown message type, unauthenticated op.
    #[error("malformed frame")]
    MalformedFrame,
    #[error("unknown message type")]
    UnknownMessageType,
    #[error("unauthenticated")]
    Unauthenticated,

    // -- Auth: unknown session, wrong pin, role mismatch, terminal state.
    #[error("unknown session")]
    UnknownSession,
    #[error("wrong pin")]
    WrongPin,
    #[error("role mismatch")]
    RoleMismatch,
    #[error("session is in a terminal state")]
    TerminalState,

    // -- Policy: threshold out of range, ineligible key, duplicate
    // signature, threshold already met.
    #[error(transparent)]
    SessionConfig(#[from] crate::model::SessionConfigError),
    #[error("ineligible-key")]
    IneligibleKey,
    #[error("duplicate-key")]
    DuplicateKey,
    #[error("threshold-already-met")]
    ThresholdAlreadyMet,
    #[error("no transaction has been injected yet")]
    NoTransaction,

    // -- Crypto: decode-error, selector-mismatch, malformed-key,
    // malformed-signature, wrong-count, verification-failed.
    #[error(transparent)]
    Decode(#[from] crate::decoder::DecodeError),
    #[error(transparent)]
    Verify(#[from] crate::verify::VerifyError),

    // -- Lifecycle: expired, cancelled, validity-window-expired.
    #[error("session expired")]
    Expired,
    #[error("session cancelled")]
    Cancelled,

    // -- Chain: transient, insufficient-signatures, other.
    #[error(transparent)]
    Chain(#[from] crate::chain::ChainError),

    // -- Resource: frame too large, rate exceeded, outbound backpressure.
    #[error("frame too large")]
    FrameTooLarge,
    #[error("rate exceeded")]
    RateExceeded,
    #[error("outbound backpressure")]
    Backpressure,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Propagation discipline: Protocol/Resource disconnect the connection;
/// Auth/Policy/Crypto reject but keep it open; Lifecycle/Chain drive
/// session transitions and broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    Disconnect,
    RejectKeepOpen,
    BroadcastTransition,
}

impl CoreError {
    /// Short machine-readable reason code surfaced in `SIGNATURE_REJECTED`
    /// / `ERROR` frames.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedFrame => "malformed-frame",
            Self::UnknownMessageType => "unknown-message-type",
            Self::Unauthenticated => "unauthenticated",
            Self::UnknownSession => "unknown-session",
            Self::WrongPin => "wrong-pin",
            Self::RoleMismatch => "role-mismatch",
            Self::TerminalState => "terminal-state",
            Self::SessionConfig(e) => match e {
                crate::model::SessionConfigError::ThresholdTooLow
                | crate::model::SessionConfigError::ThresholdExceedsEligibleKeys
                | crate::model::SessionConfigError::ExpectedParticipantsBelowThreshold => {
                    "threshold-out-of-range"
                }
            },
            Self::IneligibleKey => "ineligible-key",
            Self::DuplicateKey => "duplicate-key",
            Self::ThresholdAlreadyMet => "threshold-already-met",
            Self::NoTransaction => "no-transaction",
            Self::Decode(e) => match e {
                crate::decoder::DecodeError::SelectorMismatch => "selector-mismatch",
                crate::decoder::DecodeError::ChainAdapter(_) => "decode-error",
            },
            Self::Verify(e) => match e {
                crate::verify::VerifyError::MalformedKey => "malformed-key",
                crate::verify::VerifyError::MalformedSignature => "malformed-signature",
                crate::verify::VerifyError::WrongCount => "wrong-count",
                crate::verify::VerifyError::VerificationFailed => "verification-failed",
            },
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Chain(e) => match e {
                crate::chain::ChainError::Transient(_) => "transient",
                crate::chain::ChainError::ValidityWindowExpired => "validity-window-expired",
                crate::chain::ChainError::InsufficientSignatures => "insufficient-signatures",
                crate::chain::ChainError::Other(_) => "other",
            },
            Self::FrameTooLarge => "frame-too-large",
            Self::RateExceeded => "rate-exceeded",
            Self::Backpressure => "backpressure",
            Self::Internal(_) => "internal",
        }
    }

    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            Self::MalformedFrame
            | Self::UnknownMessageType
            | Self::Unauthenticated
            | Self::FrameTooLarge
            | Self::RateExceeded
            | Self::Backpressure => ErrorDisposition::Disconnect,

            Self::Expired | Self::Cancelled => ErrorDisposition::BroadcastTransition,
            Self::Chain(e) => match e {
                crate::chain::ChainError::ValidityWindowExpired => {
                    ErrorDisposition::BroadcastTransition
                }
                _ => ErrorDisposition::RejectKeepOpen,
            },

            _ => ErrorDisposition::RejectKeepOpen,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = match self.disposition() {
            ErrorDisposition::Disconnect => StatusCode::BAD_REQUEST,
            ErrorDisposition::RejectKeepOpen => StatusCode::CONFLICT,
            ErrorDisposition::BroadcastTransition => StatusCode::GONE,
        };

        if matches!(self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal error");
        }

        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        });

        (status, Json(body)).into_response()
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
