//! Exchange failures and their classification

use latchkey_authority::{AuthorityError, IssuanceError};
use latchkey_identity::IdentityError;
use latchkey_types::InvalidResourceId;
use thiserror::Error;

use crate::stage::Stage;

/// Message returned for every denial, whatever the reason
pub const NO_PERMISSION_GRANTED: &str = "No permission granted";

/// Why an exchange did not produce a token
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The requested repository is neither `self` nor `owner/name`
    #[error("{0}")]
    InvalidRepository(#[from] InvalidResourceId),

    #[error("token - {0}")]
    InvalidIdentity(#[from] IdentityError),

    /// The broker has no authority over the target
    #[error("No permission granted")]
    NoAuthority(#[from] AuthorityError),

    /// Policy (or narrowing) left nothing to grant. `outcome` is the
    /// evaluation label and is only ever logged.
    #[error("No permission granted")]
    NotGranted { outcome: &'static str },

    #[error("token issuance failed: {0}")]
    Issuance(#[from] IssuanceError),
}

/// How a failure is reported to the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Caused by the request. The message is safe to return.
    Client { status: u16, message: String },
    /// Anything else. Details stay in the server logs.
    Internal,
}

impl Classification {
    /// A client classification; statuses outside 4xx are internal
    pub fn client(status: u16, message: impl Into<String>) -> Self {
        if (400..=499).contains(&status) {
            Classification::Client {
                status,
                message: message.into(),
            }
        } else {
            Classification::Internal
        }
    }

    pub fn is_client(&self) -> bool {
        matches!(self, Classification::Client { .. })
    }
}

impl BrokerError {
    pub fn classification(&self) -> Classification {
        match self {
            BrokerError::InvalidRepository(_) | BrokerError::InvalidIdentity(_) => {
                Classification::client(400, self.to_string())
            }
            BrokerError::NoAuthority(_) | BrokerError::NotGranted { .. } => {
                Classification::client(403, NO_PERMISSION_GRANTED)
            }
            BrokerError::Issuance(_) => Classification::Internal,
        }
    }

    /// Last stage the exchange completed before failing
    pub fn reached(&self) -> Stage {
        match self {
            BrokerError::InvalidRepository(_) | BrokerError::InvalidIdentity(_) => Stage::Received,
            BrokerError::NoAuthority(_) => Stage::IdentityVerified,
            BrokerError::NotGranted { .. } | BrokerError::Issuance(_) => Stage::PolicyEvaluated,
        }
    }
}
