use thiserror::Error;

use crate::{ids::*, model::*};

/// Input rejected before any decision logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("correlation id is missing")]
    MissingCorrelationId,
    #[error("evidence has no target identifier")]
    MissingTarget,
    #[error("evidence has no author identity")]
    MissingAuthor,
    #[error("last activity ({last_activity_at_unix}) precedes creation ({created_at_unix})")]
    NonMonotonicTimestamps {
        created_at_unix: i64,
        last_activity_at_unix: i64,
    },
}

/// A hard safety constraint was breached. Never downgraded to a warning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("{count} candidates exceeds the maximum of {max}")]
    TooManyCandidates { count: usize, max: usize },
    #[error("action {0:?} is not on the allow-list")]
    ActionNotAllowed(ActionKind),
    #[error("target {target} has {attempts} action attempts in the last hour (limit {limit})")]
    RateLimited { target: TargetId, attempts: u32, limit: u32 },
    #[error("candidate list contains a blank identity")]
    BlankCandidate,
    #[error("author {0} is present in the candidate list")]
    AuthorIsCandidate(String),
    #[error("plan {0} has no candidates and is not executable")]
    NotExecutable(CorrelationId),
    #[error("plan {id} has {confidence:?} confidence and needs explicit approval or cancel")]
    ApprovalRequired { id: CorrelationId, confidence: ConfidenceTier },
}
