use std::time::Instant;

use tracing::{debug, warn};
use unblocker_core::{same_identity, ActionKind, ExecutionOutcome, Plan, PlanStatus, PlannedAction};
use unblocker_host::ReviewHost;

use crate::error::EngineError;

fn action_failed(plan: &Plan, action: ActionKind, err: anyhow::Error) -> EngineError {
    EngineError::ExternalActionFailure { target: plan.target.clone(), action, message: format!("{err:#}") }
}

/// Apply a claimed plan to the host and re-read the host to verify it.
///
/// Only reviewers the host does not already show are requested, so a replayed call issues
/// nothing and still verifies. The comment is posted only alongside a real request.
/// Host failures are returned once; retrying is the caller's decision.
pub fn apply(host: &dyn ReviewHost, plan: &Plan) -> Result<ExecutionOutcome, EngineError> {
    let started = Instant::now();
    let wanted = plan.reviewers();

    let current = host
        .requested_reviewers(&plan.target)
        .map_err(|e| action_failed(plan, ActionKind::RequestReviewers, e))?;
    let missing: Vec<String> =
        wanted.iter().filter(|w| !current.iter().any(|c| same_identity(c, w))).cloned().collect();

    let mut issued = vec![];
    let mut comment_posted = false;
    for action in &plan.actions {
        match action {
            PlannedAction::RequestReviewers { .. } if !missing.is_empty() => {
                host.request_reviewers(&plan.target, &missing)
                    .map_err(|e| action_failed(plan, ActionKind::RequestReviewers, e))?;
                issued = missing.clone();
            }
            PlannedAction::AddComment { body } if !issued.is_empty() => {
                host.add_comment(&plan.target, body).map_err(|e| action_failed(plan, ActionKind::AddComment, e))?;
                comment_posted = true;
            }
            _ => debug!(target_id = %plan.target, action = ?action.kind(), "already reflected on host; skipped"),
        }
    }

    let verified = match host.requested_reviewers(&plan.target) {
        Ok(after) => wanted.iter().all(|w| after.iter().any(|a| same_identity(a, w))),
        Err(e) => {
            warn!(target_id = %plan.target, error = %format!("{e:#}"), "verification read failed");
            false
        }
    };
    if !verified {
        warn!(correlation_id = %plan.correlation_id, target_id = %plan.target, "host does not yet reflect requested reviewers");
    }

    Ok(ExecutionOutcome {
        correlation_id: plan.correlation_id.clone(),
        target: plan.target.clone(),
        requested: wanted,
        issued,
        comment_posted,
        verified,
        elapsed: started.elapsed(),
        status: PlanStatus::Executed,
        plan_digest: plan.digest.clone(),
    })
}
