use serde::{Deserialize, Serialize};

use crate::{hours_between, ids::TargetId, model::*, types::EvidenceRecord};

/// Already-parsed stall rule. Free-text rule authoring happens outside the core and
/// produces this struct.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StallRule {
    pub threshold_hours: f64,
    /// Zero disables activity suppression.
    pub activity_window_hours: f64,
    pub excluded_labels: Vec<String>,
    pub source: ReviewerSource,
}

impl Default for StallRule {
    fn default() -> Self {
        Self {
            threshold_hours: 1.0,
            activity_window_hours: 5.0,
            excluded_labels: default_excluded_labels(),
            source: ReviewerSource::Ownership,
        }
    }
}

pub fn default_excluded_labels() -> Vec<String> {
    ["wip", "blocked", "parked", "do-not-merge", "waiting-on-external"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StallVerdict {
    pub matched: bool,
    pub reason: MatchReason,
}

impl StallVerdict {
    fn miss(reason: MatchReason) -> Self {
        Self { matched: false, reason }
    }
}

/// Decide whether `evidence` is an unreviewed, stalled unit of work at `now_unix`.
pub fn evaluate(evidence: &EvidenceRecord, rule: &StallRule, now_unix: i64) -> StallVerdict {
    if evidence.draft {
        return StallVerdict::miss(MatchReason::IsDraft);
    }
    let excluded = evidence
        .labels
        .iter()
        .any(|l| rule.excluded_labels.iter().any(|x| x.eq_ignore_ascii_case(l)));
    if excluded {
        return StallVerdict::miss(MatchReason::ExcludedLabel);
    }
    if !evidence.requested_reviewers.is_empty() {
        return StallVerdict::miss(MatchReason::HasReviewers);
    }
    if rule.activity_window_hours > 0.0
        && hours_between(evidence.last_activity_at_unix, now_unix) < rule.activity_window_hours
    {
        return StallVerdict::miss(MatchReason::SuppressedRecentActivity);
    }
    if hours_between(evidence.created_at_unix, now_unix) < rule.threshold_hours {
        return StallVerdict::miss(MatchReason::TooNew);
    }
    StallVerdict { matched: true, reason: MatchReason::NoReviewersAndAged }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StalledTarget {
    pub target: TargetId,
    pub age_hours: f64,
}

/// Most stalled targets a scan reports.
pub const SCAN_LIMIT: usize = 3;

/// Batch variant of [`evaluate`]: matched targets, oldest first, capped at [`SCAN_LIMIT`].
/// Records that fail [`EvidenceRecord::validate`] are skipped.
pub fn scan(records: &[EvidenceRecord], rule: &StallRule, now_unix: i64) -> Vec<StalledTarget> {
    let mut stalled: Vec<StalledTarget> = records
        .iter()
        .filter(|e| e.validate().is_ok() && evaluate(e, rule, now_unix).matched)
        .map(|e| StalledTarget { target: e.target.clone(), age_hours: e.age_hours(now_unix) })
        .collect();
    stalled.sort_by(|a, b| b.age_hours.total_cmp(&a.age_hours).then_with(|| a.target.cmp(&b.target)));
    stalled.truncate(SCAN_LIMIT);
    stalled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SECS_PER_HOUR;

    const NOW: i64 = 1_700_000_000;

    fn aged(age_hours: f64, idle_hours: f64) -> EvidenceRecord {
        EvidenceRecord {
            target: TargetId::from_str("acme/api#1"),
            created_at_unix: NOW - (age_hours * SECS_PER_HOUR as f64) as i64,
            last_activity_at_unix: NOW - (idle_hours * SECS_PER_HOUR as f64) as i64,
            draft: false,
            labels: vec![],
            requested_reviewers: vec![],
            changed_paths: vec![],
            author: "alice".into(),
        }
    }

    fn rule(threshold: f64, window: f64) -> StallRule {
        StallRule { threshold_hours: threshold, activity_window_hours: window, ..StallRule::default() }
    }

    #[test]
    fn aged_without_reviewers_matches() {
        let v = evaluate(&aged(3.7, 3.7), &rule(1.0, 0.0), NOW);
        assert_eq!(v, StallVerdict { matched: true, reason: MatchReason::NoReviewersAndAged });
    }

    #[test]
    fn requested_reviewers_never_match_regardless_of_age() {
        for age in [0.5, 2.0, 48.0, 10_000.0] {
            let mut e = aged(age, age);
            e.requested_reviewers = vec!["bob".into()];
            let v = evaluate(&e, &rule(1.0, 0.0), NOW);
            assert!(!v.matched);
            assert_eq!(v.reason, MatchReason::HasReviewers);
        }
    }

    #[test]
    fn recent_activity_suppresses_even_when_old() {
        let v = evaluate(&aged(72.0, 2.0), &rule(1.0, 5.0), NOW);
        assert_eq!(v, StallVerdict { matched: false, reason: MatchReason::SuppressedRecentActivity });
    }

    #[test]
    fn zero_window_disables_suppression() {
        let v = evaluate(&aged(72.0, 0.1), &rule(1.0, 0.0), NOW);
        assert!(v.matched);
    }

    #[test]
    fn draft_and_excluded_label_are_reported() {
        let mut e = aged(10.0, 10.0);
        e.draft = true;
        assert_eq!(evaluate(&e, &rule(1.0, 0.0), NOW).reason, MatchReason::IsDraft);

        let mut e = aged(10.0, 10.0);
        e.labels = vec!["WIP".into()];
        assert_eq!(evaluate(&e, &rule(1.0, 0.0), NOW).reason, MatchReason::ExcludedLabel);
    }

    #[test]
    fn young_unit_is_too_new() {
        let v = evaluate(&aged(0.5, 0.5), &rule(1.0, 0.0), NOW);
        assert_eq!(v.reason, MatchReason::TooNew);
    }

    #[test]
    fn scan_orders_oldest_first_and_caps() {
        let mut records = vec![];
        for (i, age) in [2.0, 30.0, 5.0, 12.0, 0.2].iter().enumerate() {
            let mut e = aged(*age, *age);
            e.target = TargetId::from_str(format!("acme/api#{i}"));
            records.push(e);
        }
        let out = scan(&records, &rule(1.0, 0.0), NOW);
        let targets: Vec<&str> = out.iter().map(|s| s.target.as_str()).collect();
        assert_eq!(targets, vec!["acme/api#1", "acme/api#3", "acme/api#2"]);
    }

    #[test]
    fn scan_skips_invalid_records() {
        let mut no_author = aged(40.0, 40.0);
        no_author.author = " ".into();
        let mut backwards = aged(30.0, 30.0);
        backwards.target = TargetId::from_str("acme/api#2");
        backwards.last_activity_at_unix = backwards.created_at_unix - 1;
        let mut fine = aged(3.0, 3.0);
        fine.target = TargetId::from_str("acme/api#3");

        let out = scan(&[no_author, backwards, fine], &rule(1.0, 0.0), NOW);
        let targets: Vec<&str> = out.iter().map(|s| s.target.as_str()).collect();
        assert_eq!(targets, vec!["acme/api#3"]);
    }

    #[test]
    fn extreme_timestamps_do_not_panic() {
        let mut e = aged(1.0, 1.0);
        e.created_at_unix = i64::MIN;
        e.last_activity_at_unix = i64::MIN;
        let v = evaluate(&e, &rule(1.0, 5.0), NOW);
        assert_eq!(v, StallVerdict { matched: true, reason: MatchReason::NoReviewersAndAged });
    }
}
