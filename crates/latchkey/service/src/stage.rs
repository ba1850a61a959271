//! Exchange pipeline stages

use std::fmt;

/// Where an exchange is in the pipeline.
///
/// Stages only move forward. `Errored` is reachable from every
/// non-terminal stage and ends the exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Received,
    IdentityVerified,
    AuthorityResolved,
    PolicyEvaluated,
    TokenIssued,
    Responded,
    Errored,
}

impl Stage {
    /// The stage following this one on the success path
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Received => Some(Stage::IdentityVerified),
            Stage::IdentityVerified => Some(Stage::AuthorityResolved),
            Stage::AuthorityResolved => Some(Stage::PolicyEvaluated),
            Stage::PolicyEvaluated => Some(Stage::TokenIssued),
            Stage::TokenIssued => Some(Stage::Responded),
            Stage::Responded | Stage::Errored => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Responded | Stage::Errored)
    }

    /// Whether moving from `self` to `to` is a legal transition
    pub fn can_transition_to(self, to: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Stage::Errored || self.next() == Some(to)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::IdentityVerified => "identity_verified",
            Stage::AuthorityResolved => "authority_resolved",
            Stage::PolicyEvaluated => "policy_evaluated",
            Stage::TokenIssued => "token_issued",
            Stage::Responded => "responded",
            Stage::Errored => "errored",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current stage of one exchange
#[derive(Debug)]
pub struct StageTracker {
    current: Stage,
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: Stage::Received,
        }
    }

    pub fn current(&self) -> Stage {
        self.current
    }

    /// Step to the next stage on the success path and return it.
    /// A terminal tracker stays where it is.
    pub fn advance(&mut self) -> Stage {
        if let Some(next) = self.current.next() {
            self.current = next;
        }
        self.current
    }

    /// End the exchange as `Errored`, returning the last stage completed
    pub fn fail(&mut self) -> Stage {
        let reached = self.current;
        if reached.can_transition_to(Stage::Errored) {
            self.current = Stage::Errored;
        }
        reached
    }
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}
