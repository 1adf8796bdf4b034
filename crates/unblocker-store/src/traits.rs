use thiserror::Error;
use unblocker_core::{CorrelationId, Plan, PlanStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no live plan for correlation id {0}")]
    NotFound(CorrelationId),
    #[error("correlation id {0} already holds a live plan")]
    DuplicateCorrelationId(CorrelationId),
    #[error("plan {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition { id: CorrelationId, from: PlanStatus, to: PlanStatus },
}

/// Correlation-keyed plan storage. Expiry is evaluated on access; there is no sweeper.
pub trait PlanStore: Send + Sync {
    /// Store `plan` under `id`. Fails if `id` still holds an unexpired plan, whatever its status.
    fn put(&self, id: &CorrelationId, plan: Plan, now_unix: i64) -> Result<(), StoreError>;

    fn get(&self, id: &CorrelationId, now_unix: i64) -> Result<Plan, StoreError>;

    /// Atomically move the plan to `to` if the current status allows it. Returns the updated plan.
    fn transition(&self, id: &CorrelationId, to: PlanStatus, now_unix: i64) -> Result<Plan, StoreError>;

    /// Drop every expired entry. Optional hygiene for a host-side reaper.
    fn purge_expired(&self, now_unix: i64) -> usize;
}
