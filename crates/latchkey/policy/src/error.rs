//! Policy document errors

use latchkey_types::InvalidResourceId;
use thiserror::Error;

/// Why a policy document was rejected
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy is not valid YAML or lacks required fields: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("policy 'self' is not a repository: {0}")]
    InvalidSelf(#[source] InvalidResourceId),

    #[error("repo pattern is {len} characters, limit is {limit}")]
    PatternTooLong { len: usize, limit: usize },

    #[error("repo pattern '{pattern}' does not compile: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
