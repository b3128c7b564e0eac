// In crates/execution/src/error.rs

use thiserror::Error;

/// Why a venue call failed.
///
/// `Timeout` and `UnknownOutcome` are *ambiguous*: the request may have reached
/// the venue and committed capital. Every other variant is a definite failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("Order rejected by venue: {reason}")]
    RejectedByVenue { reason: String },

    #[error("Venue call timed out: {detail}")]
    Timeout { detail: String },

    #[error("Authentication with venue failed: {reason}")]
    AuthFailure { reason: String },

    #[error("Invalid order parameters: {reason}")]
    InvalidParameters { reason: String },

    #[error("Venue unreachable: {reason}")]
    Unavailable { reason: String },

    #[error("Venue outcome unknown: {reason}")]
    UnknownOutcome { reason: String },
}

impl BrokerError {
    /// Returns `true` if the venue may have acted on the request.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, BrokerError::Timeout { .. } | BrokerError::UnknownOutcome { .. })
    }
}

/// Transport-level classification shared by all venues.
///
/// Venue gateways handle their own status and error codes first and fall back
/// to this for everything else.
impl From<api_client::Error> for BrokerError {
    fn from(err: api_client::Error) -> Self {
        use api_client::Error as E;
        match err {
            E::Timeout(e) => BrokerError::Timeout { detail: e.to_string() },
            E::Connect(e) => BrokerError::Unavailable { reason: e.to_string() },
            E::ClientBuildError(reason) => BrokerError::Unavailable { reason },
            E::Http { status: 401, message } => BrokerError::AuthFailure { reason: message },
            E::Http { status, message } if status >= 500 => BrokerError::UnknownOutcome {
                reason: format!("HTTP {status}: {message}"),
            },
            E::Http { status, message } => BrokerError::RejectedByVenue {
                reason: format!("HTTP {status}: {message}"),
            },
            // The request was sent but the reply could not be read or understood.
            other @ (E::RequestFailed(_)
            | E::DeserializationFailed(_)
            | E::MissingField(_)
            | E::ApiError { .. }
            | E::KiteError { .. }) => BrokerError::UnknownOutcome { reason: other.to_string() },
        }
    }
}

pub type Result<T> = std::result::Result<T, BrokerError>;
