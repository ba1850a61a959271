//! Policy evaluation and permission narrowing

use latchkey_types::{Authority, PermissionSet, ResourceId};

use crate::document::AccessPolicy;

/// Outcome of evaluating a policy for one request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Evaluation {
    /// Target has no (readable, valid) policy
    NoPolicy,
    /// Policy declares a different repository as `self` and is ignored
    ForeignPolicy { declared: ResourceId },
    /// No rule matches the caller
    NoMatchingRule,
    /// Rule at `rule` (declaration index) matched; `permissions` is the
    /// rule's request narrowed against the broker's authority, possibly
    /// empty
    Matched { rule: usize, permissions: PermissionSet },
}

impl Evaluation {
    /// Effective permissions; empty for every outcome except a match
    pub fn permissions(&self) -> PermissionSet {
        match self {
            Evaluation::Matched { permissions, .. } => permissions.clone(),
            _ => PermissionSet::new(),
        }
    }

    pub fn into_permissions(self) -> PermissionSet {
        match self {
            Evaluation::Matched { permissions, .. } => permissions,
            _ => PermissionSet::new(),
        }
    }

    /// Short label for logs
    pub fn outcome(&self) -> &'static str {
        match self {
            Evaluation::NoPolicy => "no_policy",
            Evaluation::ForeignPolicy { .. } => "foreign_policy",
            Evaluation::NoMatchingRule => "no_matching_rule",
            Evaluation::Matched { permissions, .. } if permissions.is_empty() => "narrowed_to_nothing",
            Evaluation::Matched { .. } => "granted",
        }
    }
}

/// Matches a caller against a policy and narrows the permissions
#[derive(Debug, Default)]
pub struct PolicyEvaluator;

impl PolicyEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Decide what `source` may receive on `target`.
    ///
    /// Gates, in order: a policy must exist and name `target` as `self`;
    /// the first rule (declaration order) matching `source` is used; its
    /// permissions are narrowed against `authority`.
    pub fn evaluate(
        &self,
        policy: Option<&AccessPolicy>,
        source: &ResourceId,
        target: &ResourceId,
        authority: &Authority,
    ) -> Evaluation {
        let Some(policy) = policy else {
            return Evaluation::NoPolicy;
        };

        if &policy.self_repo != target {
            return Evaluation::ForeignPolicy {
                declared: policy.self_repo.clone(),
            };
        }

        let matched = policy
            .rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.pattern.matches(source, target));

        match matched {
            Some((index, rule)) => Evaluation::Matched {
                rule: index,
                permissions: rule.permissions.narrow(&authority.permissions),
            },
            None => Evaluation::NoMatchingRule,
        }
    }
}
