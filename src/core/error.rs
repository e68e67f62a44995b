//! Domain error kinds shared by the gateway's core operations.
//!
//! Validation errors (`CodeMismatch`, `CodeExpired`, `AlreadyVerified`, ...)
//! are terminal and returned to the caller unchanged. `Transient` wraps a
//! failed upstream call and is the only kind a call site may retry.
//! `Inconsistent` means one of two required writes landed while the other
//! failed; the stores have diverged and the caller must see a failure even
//! though partial state persists.

use thiserror::Error;

use crate::identity::ProviderError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("email already in use")]
    EmailExists,

    #[error("account already verified")]
    AlreadyVerified,

    #[error("verification code still valid")]
    CodeStillValid,

    #[error("verification code expired")]
    CodeExpired,

    #[error("verification code incorrect")]
    CodeMismatch,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("reset token invalid")]
    TokenInvalid,

    #[error("reset token expired")]
    TokenExpired,

    #[error("no reset ticket matches the token")]
    TokenNotFound,

    #[error("reset token already used")]
    TokenConsumed,

    #[error("unauthorized")]
    Unauthorized,

    /// One of two required writes succeeded while the other failed. The
    /// message carries which half landed so operators can repair drift.
    #[error("stores diverged: {0}")]
    Inconsistent(String),

    #[error("upstream call failed: {0}")]
    Transient(#[source] anyhow::Error),
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound => Self::NotFound("identity"),
            ProviderError::EmailExists => Self::EmailExists,
            ProviderError::InvalidCredentials => Self::InvalidCredentials,
            ProviderError::InvalidToken => Self::Unauthorized,
            ProviderError::Transport(err) => Self::Transient(err),
        }
    }
}
