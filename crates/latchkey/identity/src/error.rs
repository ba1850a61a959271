//! Identity verification errors

use jsonwebtoken::Algorithm;
use thiserror::Error;

/// Every way an identity assertion can fail verification.
///
/// All variants are the caller's problem from the broker's point of view;
/// the message is safe to return to the caller.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("jwt malformed: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),

    #[error("jwt algorithm {0:?} is not accepted")]
    UnsupportedAlgorithm(Algorithm),

    #[error("jwt header has no key id")]
    MissingKeyId,

    #[error("no signing key found for kid '{0}'")]
    UnknownKeyId(String),

    #[error("unable to fetch signing keys: {0}")]
    KeyFetch(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("jwt issuer invalid")]
    WrongIssuer,

    #[error("jwt expired")]
    Expired,

    #[error("jwt rejected: {0}")]
    Rejected(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for IdentityError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => IdentityError::Expired,
            ErrorKind::InvalidIssuer => IdentityError::WrongIssuer,
            ErrorKind::InvalidSignature => IdentityError::InvalidSignature,
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                IdentityError::Malformed(err)
            }
            _ => IdentityError::Rejected(err),
        }
    }
}
