use thiserror::Error;

/// Every failure the pairing core can report to a caller.
///
/// All variants are caller-correctable or transient; none of them poison the
/// service. Payloads may carry paths or tool output, so they belong in the
/// response to the requester and not in shared logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairError {
    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("missing username")]
    MissingUsername,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),
}

impl PairError {
    /// Stable machine-readable identifier, used as the `code` field of error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            PairError::InvalidToken => "INVALID_TOKEN",
            PairError::TokenExpired => "TOKEN_EXPIRED",
            PairError::InvalidFormat(_) => "INVALID_FORMAT",
            PairError::MissingField(_) => "MISSING_FIELD",
            PairError::MissingUsername => "MISSING_USERNAME",
            PairError::NotFound(_) => "NOT_FOUND",
            PairError::ValidationFailed(_) => "VALIDATION_FAILED",
            PairError::WriteFailed(_) => "WRITE_FAILED",
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, PairError::ValidationFailed(_) | PairError::WriteFailed(_))
    }
}

pub type PairResult<T> = Result<T, PairError>;
