use anyhow::Result;
use unblocker_core::{Candidate, RankedEntry, TargetId};

/// The code host a plan is applied to.
pub trait ReviewHost: Send + Sync {
    /// Reviewers currently requested on `target`, as the host reports them.
    fn requested_reviewers(&self, target: &TargetId) -> Result<Vec<String>>;

    fn request_reviewers(&self, target: &TargetId, reviewers: &[String]) -> Result<()>;

    fn add_comment(&self, target: &TargetId, body: &str) -> Result<()>;
}

/// Optional re-ranking collaborator (typically model-backed). Its answer only reorders and
/// annotates; the engine merges it with `unblocker_core::merge_ranking`.
pub trait CandidateRanker: Send + Sync {
    fn rank(&self, target: &TargetId, changed_paths: &[String], candidates: &[Candidate]) -> Result<Vec<RankedEntry>>;
}
