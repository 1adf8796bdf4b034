use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{anyhow, Result};
use unblocker_core::{same_identity, Candidate, RankedEntry, TargetId};

use crate::types::{CandidateRanker, ReviewHost};

/// In-memory host for tests, fixture scenarios and dry runs.
#[derive(Default)]
pub struct MemoryHost {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    reviewers: HashMap<TargetId, Vec<String>>,
    comments: HashMap<TargetId, Vec<String>>,
    request_calls: u32,
    fail_requests: bool,
    /// Accept requests without reflecting them, like a host that applies them late.
    drop_requests: bool,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_reviewers(self, target: &TargetId, reviewers: &[&str]) -> Self {
        self.lock().reviewers.insert(target.clone(), reviewers.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn set_fail_requests(&self, fail: bool) {
        self.lock().fail_requests = fail;
    }

    pub fn set_drop_requests(&self, drop: bool) {
        self.lock().drop_requests = drop;
    }

    pub fn request_calls(&self) -> u32 {
        self.lock().request_calls
    }

    pub fn comments(&self, target: &TargetId) -> Vec<String> {
        self.lock().comments.get(target).cloned().unwrap_or_default()
    }
}

impl ReviewHost for MemoryHost {
    fn requested_reviewers(&self, target: &TargetId) -> Result<Vec<String>> {
        Ok(self.lock().reviewers.get(target).cloned().unwrap_or_default())
    }

    fn request_reviewers(&self, target: &TargetId, reviewers: &[String]) -> Result<()> {
        let mut inner = self.lock();
        inner.request_calls += 1;
        if inner.fail_requests {
            return Err(anyhow!("host rejected reviewer request for {target}"));
        }
        if inner.drop_requests {
            return Ok(());
        }
        let current = inner.reviewers.entry(target.clone()).or_default();
        for r in reviewers {
            if !current.iter().any(|c| same_identity(c, r)) {
                current.push(r.clone());
            }
        }
        Ok(())
    }

    fn add_comment(&self, target: &TargetId, body: &str) -> Result<()> {
        self.lock().comments.entry(target.clone()).or_default().push(body.to_string());
        Ok(())
    }
}

/// Ranker that always answers with a fixed list, or fails when given none.
pub struct FixedRanker {
    answer: Option<Vec<RankedEntry>>,
}

impl FixedRanker {
    pub fn new(answer: Vec<RankedEntry>) -> Self {
        Self { answer: Some(answer) }
    }

    pub fn failing() -> Self {
        Self { answer: None }
    }
}

impl CandidateRanker for FixedRanker {
    fn rank(&self, target: &TargetId, _changed_paths: &[String], _candidates: &[Candidate]) -> Result<Vec<RankedEntry>> {
        self.answer.clone().ok_or_else(|| anyhow!("ranker unavailable for {target}"))
    }
}
