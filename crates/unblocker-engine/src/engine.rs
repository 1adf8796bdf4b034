use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use unblocker_core::{
    assess_risk, classify, decide, evaluate, merge_ranking, recheck, scan, select_candidates, top_choice,
    CorrelationId, EvidenceRecord, ExecutionOutcome, GateInput, MatchReason, Plan, PlanStatus, PolicyViolation,
    ReviewContext, RiskAssessment, StalledTarget, TopChoice, ValidationError,
};
use unblocker_host::{CandidateRanker, ReviewHost};
use unblocker_store::{AttemptLedger, InMemoryPlanStore, PlanStore, StoreError};

use crate::{
    config::Config,
    error::EngineError,
    executor,
    util::{Clock, SystemClock},
};

/// What the host hands to `analyze`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub correlation_id: CorrelationId,
    pub evidence: EvidenceRecord,
    #[serde(default)]
    pub context: ReviewContext,
    /// Comment to post next to the reviewer request. Already rendered by the host.
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Analysis {
    pub matched: bool,
    pub reason: MatchReason,
    pub plan: Plan,
    pub risk: RiskAssessment,
    pub top_choice: Option<TopChoice>,
}

/// The decision engine. Holds the plan store and attempt ledger; everything else is pure.
pub struct Engine {
    cfg: Config,
    store: Box<dyn PlanStore>,
    ledger: AttemptLedger,
    host: Arc<dyn ReviewHost>,
    ranker: Option<Box<dyn CandidateRanker>>,
    clock: Box<dyn Clock>,
}

impl Engine {
    pub fn new(cfg: Config, host: Arc<dyn ReviewHost>) -> Self {
        let store = InMemoryPlanStore::new(cfg.store.plan_ttl_secs);
        let ledger = AttemptLedger::new(cfg.store.rate_window_secs);
        Self { cfg, store: Box::new(store), ledger, host, ranker: None, clock: Box::new(SystemClock) }
    }

    pub fn with_ranker(mut self, ranker: Box<dyn CandidateRanker>) -> Self {
        self.ranker = Some(ranker);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_store(mut self, store: Box<dyn PlanStore>) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Evaluate the evidence, build a plan and store it under the request's correlation id.
    pub fn analyze(&self, req: AnalyzeRequest) -> Result<Analysis, EngineError> {
        let AnalyzeRequest { correlation_id, evidence, context, comment } = req;
        if correlation_id.is_blank() {
            return Err(ValidationError::MissingCorrelationId.into());
        }
        evidence.validate()?;
        let now = self.clock.now_unix();

        let verdict = evaluate(&evidence, &self.cfg.rule, now);
        let mut candidates = if verdict.matched {
            select_candidates(
                &evidence.changed_paths,
                &context,
                &self.cfg.ladder.default_reviewers,
                &evidence.author,
                &self.cfg.ladder_options(),
                now,
            )
        } else {
            vec![]
        };
        debug!(
            correlation_id = %correlation_id,
            reason = verdict.reason.as_str(),
            candidates = candidates.len(),
            "ladder done"
        );

        if let Some(ranker) = self.ranker.as_ref().filter(|_| !candidates.is_empty()) {
            match ranker.rank(&evidence.target, &evidence.changed_paths, &candidates) {
                Ok(ranked) => candidates = merge_ranking(&candidates, &ranked),
                Err(e) => warn!(
                    correlation_id = %correlation_id,
                    error = %format!("{e:#}"),
                    "ranker failed; keeping ladder order"
                ),
            }
        }

        let confidence = classify(&candidates);
        let recent_attempts = self.ledger.count_recent(&evidence.target, now);
        let input = GateInput {
            correlation_id: correlation_id.clone(),
            target: evidence.target.clone(),
            author: evidence.author.clone(),
            verdict,
            candidates,
            comment,
            recent_attempts,
            now_unix: now,
        };
        let plan = decide(confidence, input, &self.cfg.policy)?;
        self.store.put(&correlation_id, plan.clone(), now)?;

        info!(
            correlation_id = %correlation_id,
            target_id = %plan.target,
            matched = plan.matched,
            confidence = ?plan.confidence,
            auto_execute = plan.auto_execute,
            "plan stored"
        );
        Ok(Analysis {
            matched: plan.matched,
            reason: plan.reason,
            risk: assess_risk(&evidence, Some(&plan)),
            top_choice: top_choice(&plan.candidates),
            plan,
        })
    }

    /// Execute the stored plan for `id`.
    ///
    /// `approved` is the caller's statement that a human approved this plan. It is required
    /// for low-confidence plans unless `approve` was already called. The plan is claimed
    /// (approved -> executed) before the host is touched, so only one caller ever acts.
    pub fn execute(&self, id: &CorrelationId, approved: bool) -> Result<ExecutionOutcome, EngineError> {
        if id.is_blank() {
            return Err(ValidationError::MissingCorrelationId.into());
        }
        let now = self.clock.now_unix();
        let plan = self.store.get(id, now)?;

        if plan.status.is_terminal() {
            return Err(EngineError::InvalidTransition { id: id.clone(), from: plan.status, to: PlanStatus::Executed });
        }
        if !plan.is_executable() {
            return Err(PolicyViolation::NotExecutable(id.clone()).into());
        }
        if !approved && !plan.auto_execute && plan.status != PlanStatus::Approved {
            return Err(PolicyViolation::ApprovalRequired { id: id.clone(), confidence: plan.confidence }.into());
        }
        recheck(&plan, self.ledger.count_recent(&plan.target, now), &self.cfg.policy)?;

        let limit = self.cfg.policy.max_attempts_per_hour;
        self.ledger
            .try_record(&plan.target, now, limit)
            .map_err(|attempts| PolicyViolation::RateLimited { target: plan.target.clone(), attempts, limit })?;
        let claimed = self.claim(id, plan.status, now).inspect_err(|_| self.ledger.release(&plan.target, now))?;
        debug!(correlation_id = %id, target_id = %claimed.target, "plan claimed");

        let outcome = executor::apply(self.host.as_ref(), &claimed).inspect_err(|e| {
            warn!(correlation_id = %id, error = %e, "execution failed; plan stays executed");
        })?;
        info!(
            correlation_id = %id,
            target_id = %outcome.target,
            issued = outcome.issued.len(),
            verified = outcome.verified,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "plan executed"
        );
        Ok(outcome)
    }

    /// Move the plan to executed. Another caller having already moved it to approved is not
    /// a conflict; the approved -> executed step alone picks the one caller that acts.
    fn claim(&self, id: &CorrelationId, seen: PlanStatus, now: i64) -> Result<Plan, EngineError> {
        if seen == PlanStatus::Pending {
            match self.store.transition(id, PlanStatus::Approved, now) {
                Ok(_) | Err(StoreError::InvalidTransition { from: PlanStatus::Approved, .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(self.store.transition(id, PlanStatus::Executed, now)?)
    }

    /// Record an explicit approval (pending -> approved).
    pub fn approve(&self, id: &CorrelationId) -> Result<Plan, EngineError> {
        let now = self.clock.now_unix();
        let plan = self.store.get(id, now)?;
        if !plan.is_executable() {
            return Err(PolicyViolation::NotExecutable(id.clone()).into());
        }
        let plan = self.store.transition(id, PlanStatus::Approved, now)?;
        info!(correlation_id = %id, "plan approved");
        Ok(plan)
    }

    /// Withdraw a pending plan (pending -> cancelled).
    pub fn cancel(&self, id: &CorrelationId) -> Result<Plan, EngineError> {
        let plan = self.store.transition(id, PlanStatus::Cancelled, self.clock.now_unix())?;
        info!(correlation_id = %id, "plan cancelled");
        Ok(plan)
    }

    pub fn plan(&self, id: &CorrelationId) -> Result<Plan, EngineError> {
        Ok(self.store.get(id, self.clock.now_unix())?)
    }

    /// Stalled targets among `records`, oldest first. Invalid records are skipped.
    pub fn scan(&self, records: &[EvidenceRecord]) -> Vec<StalledTarget> {
        for r in records {
            if let Err(e) = r.validate() {
                warn!(target_id = %r.target, error = %e, "skipping invalid evidence");
            }
        }
        scan(records, &self.cfg.rule, self.clock.now_unix())
    }

    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired(self.clock.now_unix())
    }
}
