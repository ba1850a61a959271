//! Latchkey Policy - self-declared repository access policies
//!
//! A repository opts in to cross-repository access by committing an
//! access policy (by default `.github/access.yaml`):
//!
//! ```yaml
//! self: octo-org/deploy-config
//! policies:
//!   - repo: self
//!     permissions:
//!       contents: write
//!   - repo: octo-org/*
//!     permissions:
//!       contents: read
//! ```
//!
//! The first rule whose `repo` pattern matches the caller decides the
//! requested permissions, which are then narrowed against what the broker
//! itself may grant.

#![deny(unsafe_code)]

mod document;
mod error;
mod evaluator;
mod fetcher;
mod pattern;

pub use document::{AccessPolicy, PolicyRule};
pub use error::PolicyError;
pub use evaluator::{Evaluation, PolicyEvaluator};
pub use fetcher::{PolicyFetcher, POLICY_PATH};
pub use pattern::{RepoPattern, MAX_PATTERN_LEN};
