use thiserror::Error;

use unblocker_core::{ActionKind, CorrelationId, PlanStatus, PolicyViolation, TargetId, ValidationError};
use unblocker_store::StoreError;

/// Every failure the engine reports to its host. Nothing here panics the host process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("policy violation: {0}")]
    Policy(#[from] PolicyViolation),
    #[error("plan for {0} expired or was never created; re-run analyze")]
    NotFound(CorrelationId),
    #[error("plan {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition { id: CorrelationId, from: PlanStatus, to: PlanStatus },
    #[error("correlation id {0} already holds a live plan")]
    DuplicateCorrelationId(CorrelationId),
    #[error("{action:?} on {target} failed: {message}")]
    ExternalActionFailure { target: TargetId, action: ActionKind, message: String },
}

impl EngineError {
    /// Stable kebab-case name, used by fixtures and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(ValidationError::MissingCorrelationId) => "missing-correlation-id",
            EngineError::Validation(_) => "validation",
            EngineError::Policy(_) => "policy-violation",
            EngineError::NotFound(_) => "not-found",
            EngineError::InvalidTransition { .. } => "invalid-transition",
            EngineError::DuplicateCorrelationId(_) => "duplicate-correlation-id",
            EngineError::ExternalActionFailure { .. } => "external-action-failure",
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            StoreError::DuplicateCorrelationId(id) => EngineError::DuplicateCorrelationId(id),
            StoreError::InvalidTransition { id, from, to } => EngineError::InvalidTransition { id, from, to },
        }
    }
}
