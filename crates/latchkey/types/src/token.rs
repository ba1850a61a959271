//! Delegated authority and issued credentials

use crate::{PermissionSet, ResourceId};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// What the broker itself may grant over one resource.
///
/// Resolved fresh for every request and never cached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub installation_id: u64,
    pub permissions: PermissionSet,
}

impl Authority {
    pub fn new(installation_id: u64, permissions: PermissionSet) -> Self {
        Self {
            installation_id,
            permissions,
        }
    }
}

/// A scoped credential minted for one request.
///
/// The token is secret: it is handed back to the caller and never
/// persisted or logged. `Debug` output redacts it.
#[derive(Debug)]
pub struct IssuedToken {
    pub repo: ResourceId,
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub permissions: PermissionSet,
}
