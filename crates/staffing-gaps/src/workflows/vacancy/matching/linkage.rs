use serde::Serialize;

use super::super::domain::{Candidate, ResponseKey};
use super::normalize::{normalize_text, MatchRules};

const MAX_SUGGESTIONS: usize = 10;
const PREFIX_SCAN_LIMIT: usize = 20;
const ROLE_SCAN_LIMIT: usize = 15;

/// A response that names or implies a substitute without linking an employee id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingLinkage {
    pub key: ResponseKey,
    pub substitute_name: Option<String>,
    pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDifficulty {
    Easy,
    Medium,
    Hard,
}

impl ReviewDifficulty {
    fn from_count(count: usize) -> Self {
        match count {
            0 | 1 => Self::Easy,
            2..=5 => Self::Medium,
            _ => Self::Hard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkageReview {
    pub pending: PendingLinkage,
    pub suggestions: Vec<Candidate>,
    pub difficulty: ReviewDifficulty,
}

fn collapse(name: &str) -> String {
    normalize_text(name)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn suggestions_for_name(name: &str, pool: &[Candidate]) -> Vec<Candidate> {
    let wanted = collapse(name);
    let exact: Vec<Candidate> = pool
        .iter()
        .filter(|candidate| collapse(&candidate.name) == wanted)
        .cloned()
        .collect();
    if !exact.is_empty() {
        return exact;
    }

    let prefix = wanted.split(' ').take(3).collect::<Vec<_>>().join(" ");
    pool.iter()
        .filter(|candidate| collapse(&candidate.name).starts_with(&prefix))
        .take(PREFIX_SCAN_LIMIT)
        .cloned()
        .collect()
}

/// Suggests employees for one unlinked response. `None` when nothing matches.
pub fn review_linkage(
    rules: &MatchRules,
    pending: PendingLinkage,
    pool: &[Candidate],
) -> Option<LinkageReview> {
    let name = pending
        .substitute_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let mut suggestions = match name {
        Some(name) => suggestions_for_name(name, pool),
        None => pool
            .iter()
            .filter(|candidate| rules.same_role(&pending.role, &candidate.role))
            .take(ROLE_SCAN_LIMIT)
            .cloned()
            .collect(),
    };
    suggestions.truncate(MAX_SUGGESTIONS);

    if suggestions.is_empty() {
        return None;
    }
    let difficulty = ReviewDifficulty::from_count(suggestions.len());
    Some(LinkageReview {
        pending,
        suggestions,
        difficulty,
    })
}

/// Reviews every pending linkage, easiest first.
pub fn review_linkages(
    rules: &MatchRules,
    pending: Vec<PendingLinkage>,
    pool: &[Candidate],
) -> Vec<LinkageReview> {
    let mut reviews: Vec<LinkageReview> = pending
        .into_iter()
        .filter_map(|item| review_linkage(rules, item, pool))
        .collect();
    reviews.sort_by_key(|review| review.difficulty);
    reviews
}
