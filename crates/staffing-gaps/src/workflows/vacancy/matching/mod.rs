//! Substitute scoring. Everything here is pure and storage-free.

mod linkage;
mod normalize;
mod score;

pub use linkage::{review_linkage, review_linkages, LinkageReview, PendingLinkage, ReviewDifficulty};
pub use normalize::{
    contract_digits, normalize_text, same_contract, same_location, MatchRules, MAX_MATCHES,
};
pub use score::{
    match_flags, rank_candidates, score_candidate, MatchFlags, MatchTarget, ScoredCandidate,
};
