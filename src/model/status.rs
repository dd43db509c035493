use serde::{Deserialize, Serialize};

/// Lifecycle status of a signing session.
///
/// See spec §4.4 for the full state machine diagram.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Waiting,
    TransactionReceived,
    Signing,
    Executing,
    Completed,
    Expired,
    Cancelled,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Expired | Self::Cancelled | Self::Failed
        )
    }

    /// Returns valid next states from this state (excludes the terminal
    /// `expired`/`cancelled` edges, which are reachable from every
    /// non-terminal status and are checked separately).
    pub fn valid_transitions(&self) -> &[SessionStatus] {
        match self {
            Self::Waiting => &[Self::TransactionReceived],
            Self::TransactionReceived => &[Self::Signing],
            Self::Signing => &[Self::Executing],
            Self::Executing => &[Self::Completed, Self::Failed],
            Self::Completed | Self::Expired | Self::Cancelled | Self::Failed => &[],
        }
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if matches!(next, Self::Expired | Self::Cancelled) {
            return true;
        }
        self.valid_transitions().contains(&next)
    }
}

/// Lifecycle status of a single participant within a session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ParticipantStatus {
    Connected,
    Ready,
    Reviewing,
    Signed,
    Rejected,
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiting_only_advances_to_transaction_received() {
        assert!(SessionStatus::Waiting.can_transition_to(SessionStatus::TransactionReceived));
        assert!(!SessionStatus::Waiting.can_transition_to(SessionStatus::Signing));
    }

    #[test]
    fn any_non_terminal_status_can_expire_or_cancel() {
        for status in [
            SessionStatus::Waiting,
            SessionStatus::TransactionReceived,
            SessionStatus::Signing,
            SessionStatus::Executing,
        ] {
            assert!(status.can_transition_to(SessionStatus::Expired));
            assert!(status.can_transition_to(SessionStatus::Cancelled));
        }
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_transitions() {
        for status in [
            SessionStatus::Completed,
            SessionStatus::Expired,
            SessionStatus::Cancelled,
            SessionStatus::Failed,
        ] {
            assert!(status.is_terminal());
            assert!(!status.can_transition_to(SessionStatus::Signing));
        }
    }
}
