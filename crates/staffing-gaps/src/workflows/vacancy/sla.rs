use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{ResponseKey, VacancyEvent};
use super::lifecycle::{days_open, derive_view, AnalystResponse, LifecycleState, LifecycleView, Resolution};

/// Non-blocking date heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspiciousDateRules {
    pub opened_before_event_days: i64,
    pub undated_open_days: i64,
}

impl Default for SuspiciousDateRules {
    fn default() -> Self {
        Self {
            opened_before_event_days: 60,
            undated_open_days: 365,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaPolicy {
    pub critical_after_days: i64,
    pub suspicious: SuspiciousDateRules,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            critical_after_days: 30,
            suspicious: SuspiciousDateRules::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SuspiciousDate {
    OpenedLongBeforeEvent { days: i64 },
    UndatedLongOpen { days: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlaAssessment {
    pub key: ResponseKey,
    pub lifecycle: LifecycleView,
    pub days_open: Option<i64>,
    pub critical: bool,
    pub suspicious: Vec<SuspiciousDate>,
}

pub fn assess(
    event: &VacancyEvent,
    response: Option<&AnalystResponse>,
    today: NaiveDate,
    policy: &SlaPolicy,
) -> SlaAssessment {
    let lifecycle = derive_view(event, response);
    let resolution = response
        .filter(|response| response.key == event.key())
        .map(|response| &response.resolution)
        .unwrap_or(&Resolution::Unanswered);
    let days = days_open(event, resolution, today);

    let mut suspicious = Vec::new();
    match resolution.opened_on() {
        Some(opened_on) => {
            let lead = (event.event_date - opened_on).num_days();
            if lead > policy.suspicious.opened_before_event_days {
                suspicious.push(SuspiciousDate::OpenedLongBeforeEvent { days: lead });
            }
        }
        None => {
            if let Some(days) = days.filter(|days| *days > policy.suspicious.undated_open_days) {
                suspicious.push(SuspiciousDate::UndatedLongOpen { days });
            }
        }
    }

    let critical = lifecycle.state.is_unresolved()
        && days.is_some_and(|days| days > policy.critical_after_days);

    SlaAssessment {
        key: event.key(),
        lifecycle,
        days_open: days,
        critical,
        suspicious,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlaSummary {
    pub total: usize,
    pub by_state: BTreeMap<LifecycleState, usize>,
    pub critical: usize,
    pub suspicious: usize,
}

/// Aggregate counters over a working set of events and their responses.
pub fn summarize<'a>(
    working_set: impl IntoIterator<Item = (&'a VacancyEvent, Option<&'a AnalystResponse>)>,
    today: NaiveDate,
    policy: &SlaPolicy,
) -> SlaSummary {
    let mut summary = SlaSummary::default();
    for (event, response) in working_set {
        let assessment = assess(event, response, today, policy);
        summary.total += 1;
        *summary.by_state.entry(assessment.lifecycle.state).or_default() += 1;
        if assessment.critical {
            summary.critical += 1;
        }
        if !assessment.suspicious.is_empty() {
            summary.suspicious += 1;
        }
    }
    summary
}
