use serde::{Deserialize, Serialize};

use crate::{model::*, types::*};

const SENSITIVE_PATTERNS: &[&str] =
    &[".env", "secret", "credential", "password", "key", "config/prod", "production", ".pem"];
const RISK_LABELS: &[&str] = &["breaking-change", "security", "critical", "urgent"];
const TYPICAL_REVIEWERS: usize = 3;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "factor", rename_all = "kebab-case")]
pub enum RiskFactor {
    ReversibleAction { action: ActionKind },
    NoActionProposed,
    SensitiveFiles { paths: Vec<String> },
    NoSensitiveFiles,
    ReviewerCount { count: usize },
    AboveTypicalReviewerCount { count: usize },
    RiskLabels { labels: Vec<String> },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
}

/// Structured risk of carrying out `plan` on the unit described by `evidence`.
pub fn assess_risk(evidence: &EvidenceRecord, plan: Option<&Plan>) -> RiskAssessment {
    let mut factors = vec![];
    let mut score = 0u32;

    match plan.and_then(|p| p.actions.first()) {
        Some(action) => factors.push(RiskFactor::ReversibleAction { action: action.kind() }),
        None => factors.push(RiskFactor::NoActionProposed),
    }

    let sensitive: Vec<String> = evidence
        .changed_paths
        .iter()
        .filter(|p| {
            let lower = p.to_lowercase();
            SENSITIVE_PATTERNS.iter().any(|s| lower.contains(s))
        })
        .take(3)
        .cloned()
        .collect();
    if sensitive.is_empty() {
        factors.push(RiskFactor::NoSensitiveFiles);
    } else {
        score += 2;
        factors.push(RiskFactor::SensitiveFiles { paths: sensitive });
    }

    let reviewers = plan.map(|p| p.candidates.len()).unwrap_or(0);
    if reviewers > TYPICAL_REVIEWERS {
        score += 1;
        factors.push(RiskFactor::AboveTypicalReviewerCount { count: reviewers });
    } else if reviewers > 0 {
        factors.push(RiskFactor::ReviewerCount { count: reviewers });
    }

    let risky: Vec<String> = evidence
        .labels
        .iter()
        .filter(|l| {
            let lower = l.to_lowercase();
            RISK_LABELS.iter().any(|r| lower.contains(r))
        })
        .cloned()
        .collect();
    if !risky.is_empty() {
        score += 1;
        factors.push(RiskFactor::RiskLabels { labels: risky });
    }

    let level = match score {
        0 => RiskLevel::Low,
        1 | 2 => RiskLevel::Medium,
        _ => RiskLevel::High,
    };
    RiskAssessment { level, factors }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "factor", rename_all = "kebab-case")]
pub enum LeadFactor {
    OnlyCandidate,
    ScoreGap { top: f64, second: f64 },
    OwnsPaths,
    RecentlyEdited,
    FastReviewer,
    BestOverall,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TopChoice {
    pub identity: String,
    pub factors: Vec<LeadFactor>,
}

/// Why the first candidate leads the list. At most two factors are reported.
pub fn top_choice(candidates: &[Candidate]) -> Option<TopChoice> {
    let top = candidates.first()?;
    let Some(second) = candidates.get(1) else {
        return Some(TopChoice { identity: top.identity.clone(), factors: vec![LeadFactor::OnlyCandidate] });
    };

    let mut factors = vec![];
    if top.score - second.score >= 0.2 {
        factors.push(LeadFactor::ScoreGap { top: top.score, second: second.score });
    }
    if top.provenance == Provenance::OwnershipMatch {
        factors.push(LeadFactor::OwnsPaths);
    }
    if top.signals.iter().any(|s| matches!(s, Signal::EditedRecently { .. })) {
        factors.push(LeadFactor::RecentlyEdited);
    }
    if top.signals.iter().any(|s| matches!(s, Signal::MedianReviewHours { slow: false, .. })) {
        factors.push(LeadFactor::FastReviewer);
    }
    if factors.is_empty() {
        factors.push(LeadFactor::BestOverall);
    }
    factors.truncate(2);
    Some(TopChoice { identity: top.identity.clone(), factors })
}
