use crate::{model::ConfidenceTier, types::Candidate};

/// Confidence from provenance and count alone. Ranker output is never consulted here.
pub fn classify(candidates: &[Candidate]) -> ConfidenceTier {
    if candidates.is_empty() {
        return ConfidenceTier::None;
    }
    let grounded = candidates.iter().filter(|c| c.provenance.is_grounded()).count();
    if candidates.len() >= 2 && grounded >= 2 {
        ConfidenceTier::High
    } else {
        ConfidenceTier::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Provenance;

    fn cand(id: &str, provenance: Provenance) -> Candidate {
        Candidate { identity: id.into(), provenance, score: 0.0, rationale: String::new(), signals: vec![] }
    }

    #[test]
    fn empty_is_none() {
        assert_eq!(classify(&[]), ConfidenceTier::None);
    }

    #[test]
    fn two_grounded_candidates_are_high() {
        let cs = [cand("a", Provenance::OwnershipMatch), cand("b", Provenance::OwnershipMatch)];
        assert_eq!(classify(&cs), ConfidenceTier::High);
        let cs = [cand("a", Provenance::RecentContributor), cand("b", Provenance::RecentContributor)];
        assert_eq!(classify(&cs), ConfidenceTier::High);
    }

    #[test]
    fn single_grounded_or_defaults_only_are_low() {
        assert_eq!(classify(&[cand("a", Provenance::OwnershipMatch)]), ConfidenceTier::Low);
        let defaults = [
            cand("a", Provenance::ConfiguredDefault),
            cand("b", Provenance::ConfiguredDefault),
            cand("c", Provenance::ConfiguredDefault),
        ];
        assert_eq!(classify(&defaults), ConfidenceTier::Low);
    }

    #[test]
    fn adding_a_grounded_candidate_never_lowers_confidence() {
        let mut cs = vec![cand("d1", Provenance::ConfiguredDefault), cand("d2", Provenance::ConfiguredDefault)];
        let rank = |t: ConfidenceTier| match t {
            ConfidenceTier::None => 0,
            ConfidenceTier::Low => 1,
            ConfidenceTier::High => 2,
        };
        let mut last = rank(classify(&cs));
        for id in ["g1", "g2", "g3"] {
            cs.push(cand(id, Provenance::OwnershipMatch));
            let now = rank(classify(&cs));
            assert!(now >= last);
            let grounded = cs.iter().filter(|c| c.provenance.is_grounded()).count();
            if grounded < 2 {
                assert_ne!(classify(&cs), ConfidenceTier::High);
            }
            last = now;
        }
        assert_eq!(classify(&cs), ConfidenceTier::High);
    }
}
