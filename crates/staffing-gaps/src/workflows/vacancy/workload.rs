use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{AnalystAssignment, AnalystRef, EventId, VacancyEvent};
use super::lifecycle::{days_open, derive_view, AnalystResponse, LifecycleState, Resolution};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadItem {
    pub event_id: EventId,
    pub employee_name: String,
    pub role: String,
    pub state: LifecycleState,
    pub days_open: Option<i64>,
    pub critical: bool,
}

/// Filled gaps and gaps the analyst decided not to open are both off the desk.
fn is_resolved(state: LifecycleState) -> bool {
    matches!(state, LifecycleState::Filled | LifecycleState::NotOpened)
}

impl WorkloadItem {
    fn is_open(&self) -> bool {
        !is_resolved(self.state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalystWorkload {
    pub analyst: AnalystRef,
    pub total: usize,
    pub open: usize,
    /// Filled or not opened.
    pub resolved: usize,
    pub critical: usize,
    /// Open events first, longest waiting first.
    pub events: Vec<WorkloadItem>,
}

/// Groups active assignments per analyst. An event assigned twice to the same
/// analyst counts once; assignments to events outside the working set are
/// skipped.
pub fn analyst_workload<'a>(
    assignments: &[AnalystAssignment],
    working_set: impl IntoIterator<Item = (&'a VacancyEvent, Option<&'a AnalystResponse>)>,
    today: NaiveDate,
    critical_after_days: i64,
) -> Vec<AnalystWorkload> {
    let mut events: HashMap<EventId, (&VacancyEvent, Option<&AnalystResponse>)> = HashMap::new();
    for (event, response) in working_set {
        events.entry(event.id).or_insert((event, response));
    }

    let mut grouped: BTreeMap<i64, (AnalystRef, HashSet<EventId>, Vec<WorkloadItem>)> =
        BTreeMap::new();
    for assignment in assignments.iter().filter(|assignment| assignment.active) {
        let Some((event, response)) = events.get(&assignment.event_id) else {
            tracing::debug!(event = %assignment.event_id, "assignment outside working set");
            continue;
        };
        let entry = grouped
            .entry(assignment.analyst.id)
            .or_insert_with(|| (assignment.analyst.clone(), HashSet::new(), Vec::new()));
        if !entry.1.insert(assignment.event_id) {
            continue;
        }

        let state = derive_view(event, *response).base_state;
        let resolution = response
            .map(|response| &response.resolution)
            .unwrap_or(&Resolution::Unanswered);
        let days = days_open(event, resolution, today);
        let critical = !is_resolved(state)
            && days.is_some_and(|days| days >= critical_after_days);
        entry.2.push(WorkloadItem {
            event_id: event.id,
            employee_name: event.employee_name.clone(),
            role: event.role.clone(),
            state,
            days_open: days,
            critical,
        });
    }

    grouped
        .into_values()
        .map(|(analyst, _, mut items)| {
            items.sort_by(|left, right| {
                right
                    .is_open()
                    .cmp(&left.is_open())
                    .then_with(|| right.days_open.cmp(&left.days_open))
            });
            let open = items.iter().filter(|item| item.is_open()).count();
            AnalystWorkload {
                analyst,
                total: items.len(),
                open,
                resolved: items.len() - open,
                critical: items.iter().filter(|item| item.critical).count(),
                events: items,
            }
        })
        .collect()
}
