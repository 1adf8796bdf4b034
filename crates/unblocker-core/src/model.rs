use serde::{Deserialize, Serialize};

/// Which ladder stage produced a candidate. Ordered from weakest to richest so the
/// derived `Ord` can pick the richest provenance when deduplicating.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    ConfiguredDefault,
    RecentContributor,
    OwnershipMatch,
}

impl Provenance {
    /// Ownership and recent-contributor candidates carry a real signal; defaults do not.
    pub fn is_grounded(&self) -> bool {
        !matches!(self, Provenance::ConfiguredDefault)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    High,
    Low,
    None,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Pending,
    Approved,
    Executed,
    Expired,
    Cancelled,
}

impl PlanStatus {
    /// Status transitions a caller may request. `Expired` is only ever reached through
    /// the store's TTL, never by request.
    pub fn can_transition_to(&self, next: PlanStatus) -> bool {
        matches!(
            (self, next),
            (PlanStatus::Pending, PlanStatus::Approved)
                | (PlanStatus::Pending, PlanStatus::Cancelled)
                | (PlanStatus::Approved, PlanStatus::Executed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Executed | PlanStatus::Expired | PlanStatus::Cancelled)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    RequestReviewers,
    AddComment,
}

/// Enumerated outcome of the stall rule.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MatchReason {
    NoReviewersAndAged,
    HasReviewers,
    IsDraft,
    ExcludedLabel,
    SuppressedRecentActivity,
    TooNew,
}

impl MatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchReason::NoReviewersAndAged => "no-reviewers-and-aged",
            MatchReason::HasReviewers => "has-reviewers",
            MatchReason::IsDraft => "is-draft",
            MatchReason::ExcludedLabel => "excluded-label",
            MatchReason::SuppressedRecentActivity => "suppressed-recent-activity",
            MatchReason::TooNew => "too-new",
        }
    }
}

/// Ladder stage a rule asks to start from.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewerSource {
    #[default]
    Ownership,
    Recent,
    Default,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}
