use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{error::ValidationError, ids::*, model::*};

/// Snapshot of one reviewable unit, produced by the host's evidence collaborator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EvidenceRecord {
    pub target: TargetId,
    pub created_at_unix: i64,
    pub last_activity_at_unix: i64,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub requested_reviewers: Vec<String>,
    #[serde(default)]
    pub changed_paths: Vec<String>,
    pub author: String,
}

impl EvidenceRecord {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.target.is_blank() {
            return Err(ValidationError::MissingTarget);
        }
        if self.author.trim().is_empty() {
            return Err(ValidationError::MissingAuthor);
        }
        if self.last_activity_at_unix < self.created_at_unix {
            return Err(ValidationError::NonMonotonicTimestamps {
                created_at_unix: self.created_at_unix,
                last_activity_at_unix: self.last_activity_at_unix,
            });
        }
        Ok(())
    }

    pub fn age_hours(&self, now_unix: i64) -> f64 {
        crate::hours_between(self.created_at_unix, now_unix)
    }

    pub fn idle_hours(&self, now_unix: i64) -> f64 {
        crate::hours_between(self.last_activity_at_unix, now_unix)
    }
}

/// Structured reviewer signal. Signals annotate a candidate for audit; they never
/// change its score or position.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Signal {
    OwnsPaths { paths: u32 },
    EditedRecently { edits: u32 },
    MedianReviewHours { hours: f64, slow: bool },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub identity: String,
    pub provenance: Provenance,
    pub score: f64,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub signals: Vec<Signal>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnershipRule {
    pub pattern: String,
    pub owners: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contribution {
    pub identity: String,
    pub committed_at_unix: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewerStats {
    #[serde(default)]
    pub recent_file_edits: u32,
    #[serde(default)]
    pub median_review_hours: Option<f64>,
}

/// Everything the ladder needs besides the evidence itself. Supplied by the host.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ReviewContext {
    #[serde(default)]
    pub ownership_rules: Vec<OwnershipRule>,
    /// Changed path -> commits touching it.
    #[serde(default)]
    pub recent_contributors: BTreeMap<String, Vec<Contribution>>,
    #[serde(default)]
    pub reviewer_stats: BTreeMap<String, ReviewerStats>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum PlannedAction {
    RequestReviewers { reviewers: Vec<String> },
    AddComment { body: String },
}

impl PlannedAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            PlannedAction::RequestReviewers { .. } => ActionKind::RequestReviewers,
            PlannedAction::AddComment { .. } => ActionKind::AddComment,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub correlation_id: CorrelationId,
    pub target: TargetId,
    pub author: String,
    pub matched: bool,
    pub reason: MatchReason,
    pub candidates: Vec<Candidate>,
    pub confidence: ConfidenceTier,
    pub auto_execute: bool,
    pub approval_required: bool,
    pub actions: Vec<PlannedAction>,
    pub created_at_unix: i64,
    pub status: PlanStatus,
    pub digest: String,
}

impl Plan {
    pub fn reviewers(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.identity.clone()).collect()
    }

    pub fn comment(&self) -> Option<&str> {
        self.actions.iter().find_map(|a| match a {
            PlannedAction::AddComment { body } => Some(body.as_str()),
            _ => None,
        })
    }

    /// A none-confidence plan only records that nothing needs doing.
    pub fn is_executable(&self) -> bool {
        self.confidence != ConfidenceTier::None && !self.candidates.is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExecutionOutcome {
    pub correlation_id: CorrelationId,
    pub target: TargetId,
    /// Reviewers the plan asked for.
    pub requested: Vec<String>,
    /// Reviewers actually sent to the host in this call (empty on an idempotent replay).
    pub issued: Vec<String>,
    pub comment_posted: bool,
    pub verified: bool,
    pub elapsed: Duration,
    pub status: PlanStatus,
    pub plan_digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence() -> EvidenceRecord {
        EvidenceRecord {
            target: TargetId::from_str("acme/api#7"),
            created_at_unix: 1_000,
            last_activity_at_unix: 2_000,
            draft: false,
            labels: vec![],
            requested_reviewers: vec![],
            changed_paths: vec!["src/lib.rs".into()],
            author: "alice".into(),
        }
    }

    #[test]
    fn valid_evidence_passes() {
        assert_eq!(evidence().validate(), Ok(()));
    }

    #[test]
    fn activity_before_creation_is_rejected() {
        let mut e = evidence();
        e.last_activity_at_unix = 999;
        assert!(matches!(e.validate(), Err(ValidationError::NonMonotonicTimestamps { .. })));
    }

    #[test]
    fn blank_target_and_author_are_rejected() {
        let mut e = evidence();
        e.target = TargetId::from_str("  ");
        assert_eq!(e.validate(), Err(ValidationError::MissingTarget));

        let mut e = evidence();
        e.author = String::new();
        assert_eq!(e.validate(), Err(ValidationError::MissingAuthor));
    }

    #[test]
    fn evidence_defaults_optional_fields_from_json() {
        let e: EvidenceRecord = serde_json::from_str(
            r#"{"target":"acme/api#1","created_at_unix":0,"last_activity_at_unix":10,"author":"bob"}"#,
        )
        .unwrap();
        assert!(!e.draft);
        assert!(e.labels.is_empty());
        assert!(e.changed_paths.is_empty());
    }
}
