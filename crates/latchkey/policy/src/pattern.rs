//! Repository patterns

use latchkey_types::ResourceId;
use regex::{Regex, RegexBuilder};

use crate::error::PolicyError;

/// Longest pattern accepted from a policy document
pub const MAX_PATTERN_LEN: usize = 256;

const SELF_PATTERN: &str = "self";
const REGEX_SIZE_LIMIT: usize = 1 << 16;

/// The `repo` selector of a policy rule.
///
/// `self` matches only a repository asking for itself. Anything else is a
/// glob over the full `owner/name` string where `*` matches any run of
/// characters (including `/`) and `?` exactly one; every other character is
/// literal.
#[derive(Clone, Debug)]
pub enum RepoPattern {
    SelfRepo,
    Glob { pattern: String, regex: Regex },
}

impl RepoPattern {
    pub fn parse(pattern: &str) -> Result<Self, PolicyError> {
        if pattern == SELF_PATTERN {
            return Ok(RepoPattern::SelfRepo);
        }

        if pattern.len() > MAX_PATTERN_LEN {
            return Err(PolicyError::PatternTooLong {
                len: pattern.len(),
                limit: MAX_PATTERN_LEN,
            });
        }

        let regex = RegexBuilder::new(&glob_to_regex(pattern))
            .size_limit(REGEX_SIZE_LIMIT)
            .build()
            .map_err(|e| PolicyError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;

        Ok(RepoPattern::Glob {
            pattern: pattern.to_string(),
            regex,
        })
    }

    /// Whether this rule applies to `source` asking for `target`
    pub fn matches(&self, source: &ResourceId, target: &ResourceId) -> bool {
        match self {
            RepoPattern::SelfRepo => source == target,
            RepoPattern::Glob { regex, .. } => regex.is_match(&source.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RepoPattern::SelfRepo => SELF_PATTERN,
            RepoPattern::Glob { pattern, .. } => pattern,
        }
    }
}

/// Escape everything, then re-open the two wildcards. Anchored both ends.
fn glob_to_regex(pattern: &str) -> String {
    let body = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    format!("^{}$", body)
}
