use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{hours_between, model::*, rerank::fallback_rationale, types::*};

/// Hard cap on proposed reviewers.
pub const MAX_CANDIDATES: usize = 3;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LadderOptions {
    pub max_candidates: usize,
    /// Commits older than this do not count as recent contributions.
    pub recency_window_hours: f64,
    /// First stage to try.
    #[serde(default)]
    pub start: ReviewerSource,
}

impl Default for LadderOptions {
    fn default() -> Self {
        Self { max_candidates: MAX_CANDIDATES, recency_window_hours: 30.0 * 24.0, start: ReviewerSource::Ownership }
    }
}

/// Identity as compared and proposed: trimmed, without a leading `@`.
pub fn normalize_identity(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_string()
}

/// Logins are case-insensitive on the hosts we target.
pub fn same_identity(a: &str, b: &str) -> bool {
    normalize_identity(a).eq_ignore_ascii_case(&normalize_identity(b))
}

fn identity_key(raw: &str) -> String {
    normalize_identity(raw).to_ascii_lowercase()
}

/// Parse CODEOWNERS-style text. Blank lines, comments and patterns without owners are skipped,
/// as are owner tokens that are nothing but `@`.
pub fn parse_codeowners(text: &str) -> Vec<OwnershipRule> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let pattern = parts.next()?;
            let owners: Vec<String> = parts
                .take_while(|p| !p.starts_with('#'))
                .map(normalize_identity)
                .filter(|o| !o.is_empty())
                .collect();
            if owners.is_empty() {
                return None;
            }
            Some(OwnershipRule { pattern: pattern.to_string(), owners })
        })
        .collect()
}

/// Length of the matched prefix, or `None` when the rule does not cover `path`.
/// `*` matches everything with the lowest specificity.
fn rule_specificity(rule: &OwnershipRule, path: &str) -> Option<usize> {
    let pattern = rule.pattern.trim();
    if pattern == "*" {
        return Some(0);
    }
    let prefix = pattern.trim_start_matches('/');
    if prefix.is_empty() {
        return None;
    }
    let hit = if prefix.ends_with('/') {
        path.starts_with(prefix)
    } else {
        path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
    };
    hit.then_some(prefix.len())
}

/// Most specific rule covering `path`; on equal specificity the later rule wins.
fn owning_rule<'a>(rules: &'a [OwnershipRule], path: &str) -> Option<&'a OwnershipRule> {
    rules
        .iter()
        .filter_map(|r| rule_specificity(r, path).map(|s| (s, r)))
        .max_by_key(|(s, _)| *s)
        .map(|(_, r)| r)
}

fn ownership_stage(paths: &[String], rules: &[OwnershipRule]) -> Vec<Candidate> {
    let mut matched: BTreeMap<String, (String, BTreeSet<&str>)> = BTreeMap::new();
    for path in paths {
        let Some(rule) = owning_rule(rules, path) else { continue };
        for owner in rule.owners.iter().filter(|o| !identity_key(o).is_empty()) {
            let entry = matched.entry(identity_key(owner)).or_insert_with(|| (normalize_identity(owner), BTreeSet::new()));
            entry.1.insert(path.as_str());
        }
    }
    matched
        .into_values()
        .map(|(identity, hits)| Candidate {
            identity,
            provenance: Provenance::OwnershipMatch,
            score: hits.len() as f64,
            rationale: String::new(),
            signals: vec![],
        })
        .collect()
}

fn recent_stage(
    paths: &[String],
    recent: &BTreeMap<String, Vec<Contribution>>,
    window_hours: f64,
    now_unix: i64,
) -> Vec<Candidate> {
    if window_hours <= 0.0 {
        return vec![];
    }
    let distinct: BTreeSet<&str> = paths.iter().map(String::as_str).collect();
    let mut weighted: BTreeMap<String, (String, f64)> = BTreeMap::new();
    for path in distinct {
        let Some(commits) = recent.get(path) else { continue };
        for c in commits {
            let age = hours_between(c.committed_at_unix, now_unix).max(0.0);
            if age > window_hours || identity_key(&c.identity).is_empty() {
                continue;
            }
            let entry = weighted.entry(identity_key(&c.identity)).or_insert_with(|| (normalize_identity(&c.identity), 0.0));
            entry.1 += 1.0 - age / window_hours;
        }
    }
    weighted
        .into_values()
        .map(|(identity, score)| Candidate {
            identity,
            provenance: Provenance::RecentContributor,
            score,
            rationale: String::new(),
            signals: vec![],
        })
        .collect()
}

fn default_stage(defaults: &[String]) -> Vec<Candidate> {
    defaults
        .iter()
        .map(|d| normalize_identity(d))
        .filter(|d| !d.is_empty())
        .map(|identity| Candidate {
            identity,
            provenance: Provenance::ConfiguredDefault,
            score: 0.0,
            rationale: String::new(),
            signals: vec![],
        })
        .collect()
}

/// Dedupe by identity (highest score, richest provenance), order by score then identity,
/// cap at `max`.
fn finalize(candidates: Vec<Candidate>, max: usize) -> Vec<Candidate> {
    let mut by_key: BTreeMap<String, Candidate> = BTreeMap::new();
    for c in candidates {
        match by_key.get_mut(&identity_key(&c.identity)) {
            Some(kept) => {
                kept.score = kept.score.max(c.score);
                kept.provenance = kept.provenance.max(c.provenance);
            }
            None => {
                by_key.insert(identity_key(&c.identity), c);
            }
        }
    }
    let mut out: Vec<Candidate> = by_key.into_values().collect();
    out.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.identity.cmp(&b.identity)));
    out.truncate(max);
    out
}

/// Run the fallback ladder: ownership, then recent contributors, then configured defaults.
/// A stage runs only when every earlier stage produced nothing once the author is removed.
pub fn select_candidates(
    changed_paths: &[String],
    context: &ReviewContext,
    configured_defaults: &[String],
    author: &str,
    options: &LadderOptions,
    now_unix: i64,
) -> Vec<Candidate> {
    const LADDER: [ReviewerSource; 3] = [ReviewerSource::Ownership, ReviewerSource::Recent, ReviewerSource::Default];
    let first = LADDER.iter().position(|s| *s == options.start).unwrap_or(0);

    for stage in &LADDER[first..] {
        let raw = match stage {
            ReviewerSource::Ownership => ownership_stage(changed_paths, &context.ownership_rules),
            ReviewerSource::Recent => {
                recent_stage(changed_paths, &context.recent_contributors, options.recency_window_hours, now_unix)
            }
            ReviewerSource::Default => default_stage(configured_defaults),
        };
        let found: Vec<Candidate> = raw.into_iter().filter(|c| !same_identity(&c.identity, author)).collect();
        if found.is_empty() {
            continue;
        }
        let mut out = finalize(found, options.max_candidates);
        for c in &mut out {
            c.rationale = fallback_rationale(c, changed_paths);
        }
        annotate_signals(&mut out, &context.reviewer_stats);
        return out;
    }
    vec![]
}

/// Attach structured signals from reviewer history. Order and score are untouched.
pub fn annotate_signals(candidates: &mut [Candidate], stats: &BTreeMap<String, ReviewerStats>) {
    for c in candidates.iter_mut() {
        let mut signals = vec![];
        if c.provenance == Provenance::OwnershipMatch {
            signals.push(Signal::OwnsPaths { paths: c.score as u32 });
        }
        let s = stats.iter().find(|(k, _)| same_identity(k, &c.identity)).map(|(_, v)| v);
        if let Some(s) = s {
            if s.recent_file_edits >= 1 {
                signals.push(Signal::EditedRecently { edits: s.recent_file_edits });
            }
            if let Some(hours) = s.median_review_hours {
                signals.push(Signal::MedianReviewHours { hours, slow: hours > 8.0 });
            }
        }
        c.signals = signals;
    }
}
