//! Permission levels and scope sets
//!
//! A [`PermissionSet`] maps a scope name (`contents`, `issues`, ...) to a
//! level. `write` implies `read`, so levels are totally ordered and
//! narrowing two sets keeps a scope only where the requested level does
//! not exceed the granted one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Access level for a single scope
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    Read,
    Write,
}

impl PermissionLevel {
    /// Parse a level; anything other than `read` or `write` is not a level
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "read" => Some(PermissionLevel::Read),
            "write" => Some(PermissionLevel::Write),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Read => "read",
            PermissionLevel::Write => "write",
        }
    }

    /// Whether a grant at this level can satisfy a request at `requested`
    pub fn covers(&self, requested: PermissionLevel) -> bool {
        requested <= *self
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mapping from scope name to level
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeMap<String, PermissionLevel>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from untyped `scope -> level` pairs.
    ///
    /// Pairs whose level is not `read` or `write` are left out, which makes
    /// an unknown level indistinguishable from an absent scope.
    pub fn from_raw<I, K, V>(raw: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        raw.into_iter()
            .filter_map(|(scope, level)| {
                PermissionLevel::parse(level.as_ref()).map(|level| (scope.into(), level))
            })
            .collect()
    }

    /// Set containing exactly one scope
    pub fn single(scope: impl Into<String>, level: PermissionLevel) -> Self {
        let mut set = Self::new();
        set.insert(scope, level);
        set
    }

    pub fn insert(&mut self, scope: impl Into<String>, level: PermissionLevel) -> Option<PermissionLevel> {
        self.0.insert(scope.into(), level)
    }

    pub fn get(&self, scope: &str) -> Option<PermissionLevel> {
        self.0.get(scope).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, PermissionLevel)> {
        self.0.iter().map(|(scope, level)| (scope.as_str(), *level))
    }

    /// Narrow `self` (what is requested) against `granted`.
    ///
    /// A scope survives only if `granted` holds it at the same or a higher
    /// level; the surviving level is the requested one. Scopes missing from
    /// `granted` count as level "none" and are dropped.
    pub fn narrow(&self, granted: &PermissionSet) -> PermissionSet {
        self.iter()
            .filter(|(scope, requested)| {
                granted
                    .get(scope)
                    .is_some_and(|level| level.covers(*requested))
            })
            .map(|(scope, level)| (scope.to_string(), level))
            .collect()
    }
}

impl FromIterator<(String, PermissionLevel)> for PermissionSet {
    fn from_iter<T: IntoIterator<Item = (String, PermissionLevel)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(scope, level)| format!("{}:{}", scope, level))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
