// Error types for door state submission and storage

use thiserror::Error;

/// Result type alias for door state operations
pub type Result<T> = std::result::Result<T, DoorstateError>;

/// Why a submission was rejected.
///
/// Only used for logging. Callers over HTTP always see the same generic
/// rejection so a forger cannot tell which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// A required field (state or signature) was absent or empty
    MissingField,
    /// Timestamp is not a non-negative integer number of seconds
    MalformedTimestamp,
    /// State is not one of the recognized tokens
    MalformedState,
    /// Signature is not hex or does not verify for (timestamp, state)
    BadSignature,
    /// Timestamp lies outside the configured freshness window
    StaleTimestamp,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::MissingField => "missing_field",
            RejectionReason::MalformedTimestamp => "malformed_timestamp",
            RejectionReason::MalformedState => "malformed_state",
            RejectionReason::BadSignature => "bad_signature",
            RejectionReason::StaleTimestamp => "stale_timestamp",
        }
    }

    /// Authentication failures as opposed to plain validation failures
    pub fn is_authentication(&self) -> bool {
        matches!(self, RejectionReason::BadSignature)
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while accepting or reading door state
#[derive(Debug, Error)]
pub enum DoorstateError {
    /// Submission failed authentication or validation; nothing was stored
    #[error("Submission rejected: {0}")]
    Rejected(RejectionReason),

    /// History store unavailable or failed
    #[error("History store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl DoorstateError {
    /// Create a rejection error
    pub fn rejected(reason: RejectionReason) -> Self {
        DoorstateError::Rejected(reason)
    }

    /// Create a history store error
    pub fn store(msg: impl Into<String>) -> Self {
        DoorstateError::Store(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        DoorstateError::Configuration(msg.into())
    }

    /// Rejection reason, if this error is a rejected submission
    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            DoorstateError::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }
}
