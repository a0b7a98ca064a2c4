use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::super::domain::{Candidate, ContractRef};
use super::normalize::{normalize_text, same_contract, same_location, MatchRules};

/// What a replacement is being sought for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTarget {
    pub role: String,
    pub location: String,
    #[serde(default)]
    pub contract: ContractRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchFlags {
    pub role: bool,
    pub location: bool,
    pub contract: bool,
}

impl MatchFlags {
    pub fn score(self) -> u32 {
        match (self.role, self.location, self.contract) {
            (true, true, true) => 10_000,
            (true, true, false) => 8_000,
            (true, false, true) => 5_000,
            (true, false, false) => 1_000,
            (false, location, contract) => {
                let mut score = 0;
                if contract {
                    score += 100;
                }
                if location {
                    score += 50;
                }
                score
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: u32,
    pub matched: MatchFlags,
}

pub fn match_flags(rules: &MatchRules, target: &MatchTarget, candidate: &Candidate) -> MatchFlags {
    MatchFlags {
        role: rules.same_role(&target.role, &candidate.role),
        location: same_location(&target.location, &candidate.location),
        contract: same_contract(&target.contract, &candidate.contract),
    }
}

pub fn score_candidate(rules: &MatchRules, target: &MatchTarget, candidate: &Candidate) -> u32 {
    match_flags(rules, target, candidate).score()
}

fn ranking(left: &ScoredCandidate, right: &ScoredCandidate) -> Ordering {
    right
        .score
        .cmp(&left.score)
        .then_with(|| {
            match (left.candidate.admission_date, right.candidate.admission_date) {
                (Some(l), Some(r)) => r.cmp(&l),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        })
        .then_with(|| left.candidate.id.cmp(&right.candidate.id))
}

/// Ranks `pool` for `target`.
///
/// Candidates whose name does not contain `name_fragment` (case-insensitive)
/// are dropped first; an empty fragment keeps everyone.
pub fn rank_candidates(
    rules: &MatchRules,
    name_fragment: &str,
    target: &MatchTarget,
    pool: &[Candidate],
) -> Vec<ScoredCandidate> {
    let fragment = normalize_text(name_fragment);
    let mut scored: Vec<ScoredCandidate> = pool
        .iter()
        .filter(|candidate| fragment.is_empty() || normalize_text(&candidate.name).contains(&fragment))
        .map(|candidate| {
            let matched = match_flags(rules, target, candidate);
            ScoredCandidate {
                candidate: candidate.clone(),
                score: matched.score(),
                matched,
            }
        })
        .collect();

    scored.sort_by(ranking);
    scored.truncate(rules.effective_limit());
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::vacancy::domain::{EmployeeId, Location};
    use chrono::NaiveDate;

    fn candidate(id: i64, name: &str, role: &str, unit: &str, contract: &str) -> Candidate {
        Candidate {
            id: EmployeeId(id),
            name: name.to_string(),
            role: role.to_string(),
            location: Location {
                cost_center: Some(unit.to_string()),
                workplace: None,
            },
            contract: ContractRef {
                contract_id: Some(contract.to_string()),
                trade_name: None,
            },
            admission_date: None,
        }
    }

    fn target() -> MatchTarget {
        MatchTarget {
            role: "Nurse".to_string(),
            location: "Unit A".to_string(),
            contract: ContractRef {
                contract_id: Some("111".to_string()),
                trade_name: None,
            },
        }
    }

    #[test]
    fn score_table_is_strictly_ordered() {
        let rules = MatchRules::default();
        let target = target();
        let scores: Vec<u32> = [
            candidate(1, "a", "Nurse", "Unit A", "111"),
            candidate(2, "b", "Nurse", "Unit A", "999"),
            candidate(3, "c", "Nurse Lead", "Unit B", "111"),
            candidate(4, "d", "Nurse", "Unit B", "999"),
            candidate(5, "e", "Cook", "Unit A", "111"),
        ]
        .iter()
        .map(|candidate| score_candidate(&rules, &target, candidate))
        .collect();

        assert_eq!(scores, vec![10_000, 8_000, 5_000, 1_000, 150]);
    }

    #[test]
    fn ties_prefer_recent_admissions_then_id() {
        let rules = MatchRules::default();
        let mut older = candidate(1, "Older", "Nurse", "Unit B", "9");
        older.admission_date = NaiveDate::from_ymd_opt(2019, 3, 1);
        let mut newer = candidate(2, "Newer", "Nurse", "Unit B", "9");
        newer.admission_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        let undated = candidate(0, "Undated", "Nurse", "Unit B", "9");

        let ranked = rank_candidates(&rules, "", &target(), &[older, undated, newer]);
        let order: Vec<i64> = ranked.iter().map(|scored| scored.candidate.id.0).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn fragment_filters_and_limit_caps() {
        let rules = MatchRules {
            limit: 2,
            ..MatchRules::default()
        };
        let pool: Vec<Candidate> = (1..=5)
            .map(|id| candidate(id, &format!("Maria {id}"), "Nurse", "Unit A", "111"))
            .chain(std::iter::once(candidate(9, "Joao", "Nurse", "Unit A", "111")))
            .collect();

        let ranked = rank_candidates(&rules, "  MARIA", &target(), &pool);
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|scored| scored.candidate.name.starts_with("Maria")));
    }

    #[test]
    fn empty_inputs_score_zero() {
        let rules = MatchRules::default();
        let blank = Candidate {
            id: EmployeeId(1),
            name: String::new(),
            role: String::new(),
            location: Location::default(),
            contract: ContractRef::default(),
            admission_date: None,
        };
        assert_eq!(score_candidate(&rules, &MatchTarget::default(), &blank), 0);
    }
}
