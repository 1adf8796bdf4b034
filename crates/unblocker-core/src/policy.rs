use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::PolicyViolation,
    ids::*,
    ladder::{normalize_identity, same_identity, MAX_CANDIDATES},
    model::*,
    stall::StallVerdict,
    types::*,
};

/// Hard limits the gate enforces before any plan leaves the core.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyConstraints {
    pub max_candidates: usize,
    pub allowed_actions: Vec<ActionKind>,
    /// Action attempts allowed per target in any rolling hour.
    pub max_attempts_per_hour: u32,
}

impl Default for PolicyConstraints {
    fn default() -> Self {
        Self {
            max_candidates: MAX_CANDIDATES,
            allowed_actions: vec![ActionKind::RequestReviewers, ActionKind::AddComment],
            max_attempts_per_hour: 3,
        }
    }
}

/// Everything the gate needs to turn a classified candidate list into a plan.
#[derive(Clone, Debug)]
pub struct GateInput {
    pub correlation_id: CorrelationId,
    pub target: TargetId,
    pub author: String,
    pub verdict: StallVerdict,
    pub candidates: Vec<Candidate>,
    /// Host-supplied comment body to post alongside the reviewer request.
    pub comment: Option<String>,
    /// Attempts already recorded for `target` in the last hour.
    pub recent_attempts: u32,
    pub now_unix: i64,
}

/// Derive the autonomy flags and build a pending plan, or refuse with a violation.
pub fn decide(
    confidence: ConfidenceTier,
    input: GateInput,
    constraints: &PolicyConstraints,
) -> Result<Plan, PolicyViolation> {
    let GateInput { correlation_id, target, author, verdict, mut candidates, comment, recent_attempts, now_unix } =
        input;

    let mut actions = vec![];
    if confidence == ConfidenceTier::None {
        candidates.clear();
    } else {
        actions.push(PlannedAction::RequestReviewers {
            reviewers: candidates.iter().map(|c| c.identity.clone()).collect(),
        });
        if let Some(body) = comment.filter(|b| !b.trim().is_empty()) {
            actions.push(PlannedAction::AddComment { body });
        }
    }

    check_constraints(&target, &author, &candidates, &actions, recent_attempts, constraints)?;

    let approval_required = matches!(confidence, ConfidenceTier::Low | ConfidenceTier::None);
    let auto_execute = confidence == ConfidenceTier::High && verdict.matched;

    let mut plan = Plan {
        correlation_id,
        target,
        author,
        matched: verdict.matched,
        reason: verdict.reason,
        candidates,
        confidence,
        auto_execute,
        approval_required,
        actions,
        created_at_unix: now_unix,
        status: PlanStatus::Pending,
        digest: String::new(),
    };
    plan.digest = plan_digest(&plan);
    Ok(plan)
}

/// Re-run the hard constraints against a stored plan right before execution.
pub fn recheck(plan: &Plan, recent_attempts: u32, constraints: &PolicyConstraints) -> Result<(), PolicyViolation> {
    if !plan.is_executable() {
        return Err(PolicyViolation::NotExecutable(plan.correlation_id.clone()));
    }
    check_constraints(&plan.target, &plan.author, &plan.candidates, &plan.actions, recent_attempts, constraints)
}

fn check_constraints(
    target: &TargetId,
    author: &str,
    candidates: &[Candidate],
    actions: &[PlannedAction],
    recent_attempts: u32,
    constraints: &PolicyConstraints,
) -> Result<(), PolicyViolation> {
    if candidates.len() > constraints.max_candidates {
        return Err(PolicyViolation::TooManyCandidates { count: candidates.len(), max: constraints.max_candidates });
    }
    if let Some(bad) = actions.iter().map(PlannedAction::kind).find(|k| !constraints.allowed_actions.contains(k)) {
        return Err(PolicyViolation::ActionNotAllowed(bad));
    }
    // A plan without actions attempts nothing, so it never counts against the limit.
    if !actions.is_empty() && recent_attempts >= constraints.max_attempts_per_hour {
        return Err(PolicyViolation::RateLimited {
            target: target.clone(),
            attempts: recent_attempts,
            limit: constraints.max_attempts_per_hour,
        });
    }
    if candidates.iter().any(|c| normalize_identity(&c.identity).is_empty()) {
        return Err(PolicyViolation::BlankCandidate);
    }
    if let Some(c) = candidates.iter().find(|c| same_identity(&c.identity, author)) {
        return Err(PolicyViolation::AuthorIsCandidate(c.identity.clone()));
    }
    Ok(())
}

fn digest_field(h: &mut Sha256, bytes: &[u8]) {
    h.update((bytes.len() as u64).to_be_bytes());
    h.update(bytes);
}

/// SHA-256 over the decision-relevant content of a plan, hex encoded.
pub fn plan_digest(plan: &Plan) -> String {
    let mut h = Sha256::new();
    digest_field(&mut h, plan.correlation_id.as_str().as_bytes());
    digest_field(&mut h, plan.target.as_str().as_bytes());
    for c in &plan.candidates {
        digest_field(&mut h, c.identity.as_bytes());
        digest_field(&mut h, format!("{:?}", c.provenance).as_bytes());
        digest_field(&mut h, &c.score.to_bits().to_be_bytes());
    }
    for a in &plan.actions {
        match a {
            PlannedAction::RequestReviewers { reviewers } => {
                digest_field(&mut h, b"request-reviewers");
                for r in reviewers {
                    digest_field(&mut h, r.as_bytes());
                }
            }
            PlannedAction::AddComment { body } => {
                digest_field(&mut h, b"add-comment");
                digest_field(&mut h, body.as_bytes());
            }
        }
    }
    hex::encode(h.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::classify;

    fn cand(id: &str, provenance: Provenance) -> Candidate {
        Candidate { identity: id.into(), provenance, score: 1.0, rationale: String::new(), signals: vec![] }
    }

    fn input(candidates: Vec<Candidate>) -> GateInput {
        GateInput {
            correlation_id: CorrelationId::from_str("orch_1"),
            target: TargetId::from_str("acme/api#9"),
            author: "alice".into(),
            verdict: StallVerdict { matched: true, reason: MatchReason::NoReviewersAndAged },
            candidates,
            comment: None,
            recent_attempts: 0,
            now_unix: 100,
        }
    }

    fn gate(candidates: Vec<Candidate>) -> Result<Plan, PolicyViolation> {
        let tier = classify(&candidates);
        decide(tier, input(candidates), &PolicyConstraints::default())
    }

    #[test]
    fn high_confidence_auto_executes() {
        let plan = gate(vec![cand("bob", Provenance::OwnershipMatch), cand("carol", Provenance::OwnershipMatch)]).unwrap();
        assert!(plan.auto_execute);
        assert!(!plan.approval_required);
        assert_eq!(plan.status, PlanStatus::Pending);
        assert_eq!(plan.actions, vec![PlannedAction::RequestReviewers { reviewers: vec!["bob".into(), "carol".into()] }]);
        assert_eq!(plan.digest.len(), 64);
    }

    #[test]
    fn low_confidence_requires_approval() {
        let plan = gate(vec![cand("dflt", Provenance::ConfiguredDefault)]).unwrap();
        assert!(!plan.auto_execute);
        assert!(plan.approval_required);
    }

    #[test]
    fn none_confidence_is_reported_not_executable() {
        let plan = gate(vec![]).unwrap();
        assert_eq!(plan.confidence, ConfidenceTier::None);
        assert!(plan.candidates.is_empty());
        assert!(plan.actions.is_empty());
        assert!(!plan.auto_execute);
        assert!(!plan.is_executable());
        assert!(matches!(recheck(&plan, 0, &PolicyConstraints::default()), Err(PolicyViolation::NotExecutable(_))));
    }

    #[test]
    fn unmatched_high_tier_does_not_auto_execute() {
        let cs = vec![cand("bob", Provenance::OwnershipMatch), cand("carol", Provenance::OwnershipMatch)];
        let mut i = input(cs);
        i.verdict = StallVerdict { matched: false, reason: MatchReason::TooNew };
        let plan = decide(ConfidenceTier::High, i, &PolicyConstraints::default()).unwrap();
        assert!(!plan.auto_execute);
        assert!(!plan.approval_required);
    }

    #[test]
    fn too_many_candidates_is_fatal() {
        let cs: Vec<Candidate> = ["a", "b", "c", "d"].iter().map(|i| cand(i, Provenance::OwnershipMatch)).collect();
        assert_eq!(gate(cs), Err(PolicyViolation::TooManyCandidates { count: 4, max: 3 }));
    }

    #[test]
    fn blank_identity_is_fatal() {
        let cs = vec![cand("@", Provenance::OwnershipMatch), cand("bob", Provenance::OwnershipMatch)];
        assert_eq!(gate(cs), Err(PolicyViolation::BlankCandidate));
        assert_eq!(gate(vec![cand("  ", Provenance::ConfiguredDefault)]), Err(PolicyViolation::BlankCandidate));
    }

    #[test]
    fn author_is_rechecked() {
        let err = gate(vec![cand("@Alice", Provenance::OwnershipMatch)]).unwrap_err();
        assert_eq!(err, PolicyViolation::AuthorIsCandidate("@Alice".into()));
    }

    #[test]
    fn comment_outside_allow_list_is_refused() {
        let constraints = PolicyConstraints { allowed_actions: vec![ActionKind::RequestReviewers], ..Default::default() };
        let mut i = input(vec![cand("bob", Provenance::OwnershipMatch)]);
        i.comment = Some("please take a look".into());
        assert_eq!(decide(ConfidenceTier::Low, i, &constraints), Err(PolicyViolation::ActionNotAllowed(ActionKind::AddComment)));
    }

    #[test]
    fn rate_limit_applies_only_when_acting() {
        let mut i = input(vec![cand("bob", Provenance::OwnershipMatch)]);
        i.recent_attempts = 3;
        assert!(matches!(decide(ConfidenceTier::Low, i, &PolicyConstraints::default()), Err(PolicyViolation::RateLimited { attempts: 3, limit: 3, .. })));

        let mut i = input(vec![]);
        i.recent_attempts = 99;
        assert!(decide(ConfidenceTier::None, i, &PolicyConstraints::default()).is_ok());
    }

    #[test]
    fn digest_tracks_plan_content() {
        let a = gate(vec![cand("bob", Provenance::OwnershipMatch)]).unwrap();
        let b = gate(vec![cand("carol", Provenance::OwnershipMatch)]).unwrap();
        assert_ne!(a.digest, b.digest);
        assert_eq!(a.digest, plan_digest(&a));
    }
}
