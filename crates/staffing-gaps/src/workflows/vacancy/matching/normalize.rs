use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::super::domain::{ContractRef, Location};

const DEFAULT_QUALIFIERS: &[&str] = &[
    "lead",
    "lider",
    "substitute",
    "substituto",
    "interim",
    "interino",
    "coordinator",
    "coordenador",
    "manager",
    "gerente",
    "supervisor",
    "chief",
    "chefe",
    "assistant",
    "assistente",
    "auxiliary",
    "auxiliar",
    "aux.",
    "technician",
    "tecnico",
];

/// Upper bound on ranked results regardless of configuration.
pub const MAX_MATCHES: usize = 50;

/// Tunables for role comparison and result size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRules {
    /// Words dropped from a role title when they are not its first word.
    /// Compared after `normalize_text`, so accents and case do not matter.
    pub qualifiers: Vec<String>,
    pub limit: usize,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            qualifiers: DEFAULT_QUALIFIERS
                .iter()
                .map(|qualifier| qualifier.to_string())
                .collect(),
            limit: MAX_MATCHES,
        }
    }
}

impl MatchRules {
    pub fn effective_limit(&self) -> usize {
        self.limit.clamp(1, MAX_MATCHES)
    }

    /// `"Nurse Lead"` and `"nurse"` normalize to the same title. The first word
    /// is always kept, so a bare `"Supervisor"` stays comparable.
    pub fn normalize_role(&self, role: &str) -> String {
        let folded = normalize_text(role);
        let mut words = folded.split_whitespace();
        let Some(first) = words.next() else {
            return String::new();
        };

        let mut normalized = first.to_string();
        for word in words {
            if self
                .qualifiers
                .iter()
                .any(|qualifier| normalize_text(qualifier) == word)
            {
                continue;
            }
            normalized.push(' ');
            normalized.push_str(word);
        }
        normalized
    }

    pub fn same_role(&self, left: &str, right: &str) -> bool {
        let left = self.normalize_role(left);
        !left.is_empty() && left == self.normalize_role(right)
    }
}

/// Trimmed, lowercased and stripped of diacritics: `" Técnico "` becomes `"tecnico"`.
pub fn normalize_text(value: &str) -> String {
    value
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Target location against either candidate field. An empty target matches nothing.
pub fn same_location(target: &str, candidate: &Location) -> bool {
    let target = normalize_text(target);
    if target.is_empty() {
        return false;
    }
    [&candidate.cost_center, &candidate.workplace]
        .into_iter()
        .flatten()
        .any(|field| normalize_text(field) == target)
}

pub fn contract_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Registry ids compare digit-for-digit; trade names are the fallback when
/// either side has no usable id.
pub fn same_contract(target: &ContractRef, candidate: &ContractRef) -> bool {
    let ids = (
        target.contract_id.as_deref().map(contract_digits),
        candidate.contract_id.as_deref().map(contract_digits),
    );
    if let (Some(left), Some(right)) = ids {
        if !left.is_empty() && !right.is_empty() {
            return left == right;
        }
    }

    match (&target.trade_name, &candidate.trade_name) {
        (Some(left), Some(right)) => {
            let left = normalize_text(left);
            !left.is_empty() && left == normalize_text(right)
        }
        _ => false,
    }
}
