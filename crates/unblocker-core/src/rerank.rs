use serde::{Deserialize, Serialize};

use crate::{ladder::same_identity, model::Provenance, types::Candidate};

/// One line of an external ranker's answer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankedEntry {
    pub identity: String,
    #[serde(default)]
    pub rationale: Option<String>,
}

/// Re-sequence `candidates` in the order the ranker returned and take its rationale text.
///
/// Membership, provenance and score always come from `candidates`: identities the ranker
/// invents are dropped, and ones it forgets keep their ladder order after the ranked ones.
pub fn merge_ranking(candidates: &[Candidate], ranked: &[RankedEntry]) -> Vec<Candidate> {
    let mut used = vec![false; candidates.len()];
    let mut out = Vec::with_capacity(candidates.len());

    for entry in ranked {
        let hit = candidates
            .iter()
            .enumerate()
            .find(|(i, c)| !used[*i] && same_identity(&c.identity, &entry.identity));
        let Some((i, c)) = hit else { continue };
        used[i] = true;
        let mut c = c.clone();
        if let Some(text) = entry.rationale.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            c.rationale = text.to_string();
        }
        out.push(c);
    }
    for (i, c) in candidates.iter().enumerate() {
        if !used[i] {
            out.push(c.clone());
        }
    }
    out
}

/// Deterministic rationale used when no ranker is configured or the ranker fails.
pub fn fallback_rationale(candidate: &Candidate, changed_paths: &[String]) -> String {
    match candidate.provenance {
        Provenance::OwnershipMatch => {
            let mut dirs: Vec<&str> = changed_paths
                .iter()
                .take(5)
                .filter_map(|p| p.split_once('/').map(|(top, _)| top))
                .collect();
            dirs.sort_unstable();
            dirs.dedup();
            if dirs.is_empty() {
                "Owns the changed paths".to_string()
            } else {
                let shown: Vec<String> = dirs.iter().take(2).map(|d| format!("{d}/")).collect();
                format!("Owns changed paths under {}", shown.join(", "))
            }
        }
        Provenance::RecentContributor => "Recently contributed to the changed files".to_string(),
        Provenance::ConfiguredDefault => "Default reviewer for this repository".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(id: &str, score: f64) -> Candidate {
        Candidate {
            identity: id.into(),
            provenance: Provenance::OwnershipMatch,
            score,
            rationale: "ladder".into(),
            signals: vec![],
        }
    }

    fn entry(id: &str, why: Option<&str>) -> RankedEntry {
        RankedEntry { identity: id.into(), rationale: why.map(String::from) }
    }

    #[test]
    fn reorders_without_touching_provenance_or_score() {
        let cs = vec![cand("a", 3.0), cand("b", 2.0), cand("c", 1.0)];
        let out = merge_ranking(&cs, &[entry("@C", Some("knows the parser")), entry("a", None)]);
        let ids: Vec<&str> = out.iter().map(|c| c.identity.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(out[0].score, 1.0);
        assert_eq!(out[0].rationale, "knows the parser");
        assert_eq!(out[1].rationale, "ladder");
    }

    #[test]
    fn unknown_and_repeated_identities_are_ignored() {
        let cs = vec![cand("a", 1.0), cand("b", 1.0)];
        let out = merge_ranking(&cs, &[entry("mallory", Some("trust me")), entry("b", None), entry("b", None)]);
        let ids: Vec<&str> = out.iter().map(|c| c.identity.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn ownership_rationale_names_top_directories() {
        let paths = vec!["src/a.rs".to_string(), "api/b.rs".to_string(), "src/c.rs".to_string(), "README".to_string()];
        assert_eq!(fallback_rationale(&cand("a", 1.0), &paths), "Owns changed paths under api/, src/");
    }
}
