pub mod ids;
pub mod participant;
pub mod session;
pub mod signature;
pub mod status;

pub use ids::{ParticipantId, SessionId};
pub use participant::{Participant, Subscription};
pub use session::{Session, SessionConfig, SessionConfigError};
pub use signature::{Signature, SignaturePayload};
pub use status::{ParticipantStatus, SessionStatus};
