//! Resource identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Literal a caller sends to ask for its own repository.
pub const SELF_SENTINEL: &str = "self";

/// A repository addressed as `owner/name`.
///
/// Owner and name are kept apart so each can be matched on its own; the
/// string form is always `owner/name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    owner: String,
    name: String,
}

impl ResourceId {
    /// Build from separate owner and name parts
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, InvalidResourceId> {
        let owner = owner.into();
        let name = name.into();
        if !is_valid_part(&owner) || !is_valid_part(&name) {
            return Err(InvalidResourceId(format!("{}/{}", owner, name)));
        }
        Ok(Self { owner, name })
    }

    /// Parse an `owner/name` string
    pub fn parse(value: &str) -> Result<Self, InvalidResourceId> {
        match value.split_once('/') {
            Some((owner, name)) => {
                Self::new(owner, name).map_err(|_| InvalidResourceId(value.to_string()))
            }
            None => Err(InvalidResourceId(value.to_string())),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn is_valid_part(part: &str) -> bool {
    !part.is_empty()
        && !part.contains('/')
        && !part.chars().any(|c| c.is_whitespace() || c.is_control())
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for ResourceId {
    type Err = InvalidResourceId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = InvalidResourceId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}

/// A string that is not of the form `owner/name`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid repository '{0}', expected 'owner/name'")]
pub struct InvalidResourceId(pub String);

/// Which repository a caller asks a token for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepoSelector {
    /// The caller's own repository, requested with the `self` literal
    Own,
    /// An explicitly named repository
    Named(ResourceId),
}

impl RepoSelector {
    pub fn parse(value: &str) -> Result<Self, InvalidResourceId> {
        if value == SELF_SENTINEL {
            Ok(RepoSelector::Own)
        } else {
            ResourceId::parse(value).map(RepoSelector::Named)
        }
    }

    /// Resolve against the caller's asserted repository
    pub fn resolve(&self, source: &ResourceId) -> ResourceId {
        match self {
            RepoSelector::Own => source.clone(),
            RepoSelector::Named(target) => target.clone(),
        }
    }
}
