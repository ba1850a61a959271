//! Policy document parsing and validation

use latchkey_types::{PermissionSet, ResourceId};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::PolicyError;
use crate::pattern::RepoPattern;

/// Wire shape of the YAML document, validated into [`AccessPolicy`]
#[derive(Deserialize)]
struct PolicyDocument {
    #[serde(rename = "self")]
    self_repo: String,
    policies: Vec<RuleDocument>,
}

#[derive(Deserialize)]
struct RuleDocument {
    repo: String,
    /// Levels are kept loose so a non-string level drops only its scope
    permissions: BTreeMap<String, serde_yaml::Value>,
}

/// A repository's access policy
#[derive(Clone, Debug)]
pub struct AccessPolicy {
    /// The repository this policy claims to belong to
    pub self_repo: ResourceId,
    /// Rules in declaration order
    pub rules: Vec<PolicyRule>,
}

/// One `repo` pattern and the permissions it asks for
#[derive(Clone, Debug)]
pub struct PolicyRule {
    pub pattern: RepoPattern,
    /// Only `read`/`write` entries survive parsing; other levels are
    /// dropped here exactly as narrowing would drop them.
    pub permissions: PermissionSet,
}

impl AccessPolicy {
    /// Parse and validate a YAML policy document
    pub fn from_yaml(content: &[u8]) -> Result<Self, PolicyError> {
        let document: PolicyDocument = serde_yaml::from_slice(content)?;

        let self_repo = ResourceId::parse(&document.self_repo).map_err(PolicyError::InvalidSelf)?;

        let rules = document
            .policies
            .into_iter()
            .map(|rule| {
                Ok(PolicyRule {
                    pattern: RepoPattern::parse(&rule.repo)?,
                    permissions: PermissionSet::from_raw(rule.permissions.iter().filter_map(
                        |(scope, level)| level.as_str().map(|level| (scope.as_str(), level)),
                    )),
                })
            })
            .collect::<Result<Vec<_>, PolicyError>>()?;

        Ok(Self { self_repo, rules })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_types::PermissionLevel;

    #[test]
    fn test_parse_full_document() {
        let yaml = br#"
self: octo-org/config
policies:
  - repo: self
    permissions:
      contents: write
  - repo: octo-org/*
    permissions:
      contents: read
      issues: admin
"#;
        let policy = AccessPolicy::from_yaml(yaml).unwrap();
        assert_eq!(policy.self_repo.to_string(), "octo-org/config");
        assert_eq!(policy.rules.len(), 2);
        assert!(matches!(policy.rules[0].pattern, RepoPattern::SelfRepo));
        assert_eq!(policy.rules[1].pattern.as_str(), "octo-org/*");
        assert_eq!(
            policy.rules[1].permissions,
            PermissionSet::single("contents", PermissionLevel::Read)
        );
    }

    #[test]
    fn test_missing_fields_rejected() {
        assert!(matches!(
            AccessPolicy::from_yaml(b"policies: []\n"),
            Err(PolicyError::Parse(_))
        ));
        assert!(matches!(
            AccessPolicy::from_yaml(b"self: org/a\n"),
            Err(PolicyError::Parse(_))
        ));
        assert!(matches!(
            AccessPolicy::from_yaml(b"self: org/a\npolicies:\n  - repo: org/b\n"),
            Err(PolicyError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_and_garbage_rejected() {
        assert!(AccessPolicy::from_yaml(b"").is_err());
        assert!(AccessPolicy::from_yaml(b"- just\n- a list\n").is_err());
        assert!(AccessPolicy::from_yaml(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn test_invalid_self_rejected() {
        let err = AccessPolicy::from_yaml(b"self: not-a-repo\npolicies: []\n").unwrap_err();
        assert!(matches!(err, PolicyError::InvalidSelf(_)));
    }

    #[test]
    fn test_overlong_pattern_rejects_document() {
        let yaml = format!(
            "self: org/a\npolicies:\n  - repo: {}\n    permissions: {{}}\n",
            "x".repeat(300)
        );
        assert!(matches!(
            AccessPolicy::from_yaml(yaml.as_bytes()),
            Err(PolicyError::PatternTooLong { .. })
        ));
    }

    #[test]
    fn test_non_string_level_drops_only_that_scope() {
        let yaml = b"self: org/a\npolicies:\n  - repo: org/b\n    permissions:\n      contents: true\n      statuses: 3\n      issues: read\n";
        let policy = AccessPolicy::from_yaml(yaml).unwrap();
        assert_eq!(
            policy.rules[0].permissions,
            PermissionSet::single("issues", PermissionLevel::Read)
        );
    }

    #[test]
    fn test_extra_keys_tolerated() {
        let yaml = b"self: org/a\nversion: 2\npolicies:\n  - repo: org/b\n    comment: hi\n    permissions:\n      pages: read\n";
        let policy = AccessPolicy::from_yaml(yaml).unwrap();
        assert_eq!(policy.rules.len(), 1);
    }
}
