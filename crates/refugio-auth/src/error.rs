//! Error types.

use thiserror::Error;

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// No credential was presented.
    #[error("authentication token is missing")]
    MissingToken,

    /// Credential is not a well-formed JWT or its claims do not match.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Signature does not match the configured secret.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Credential is outside its validity window.
    #[error("token expired")]
    Expired,

    /// Algorithm is not in the allow-list.
    #[error("unsupported JWT algorithm: {0:?}")]
    UnsupportedAlg(jsonwebtoken::Algorithm),

    /// Codec or cookie options are unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// jsonwebtoken error while issuing.
    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

impl Error {
    /// True for every way a presented credential can be turned down. Callers
    /// map all of these to one generic "unauthenticated" outcome.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::MissingToken
                | Error::Malformed(_)
                | Error::InvalidSignature
                | Error::Expired
                | Error::UnsupportedAlg(_)
        )
    }
}
