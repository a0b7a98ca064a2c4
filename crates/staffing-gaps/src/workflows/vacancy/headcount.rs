use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{HeadcountTarget, RosterEntry};
use super::matching::{normalize_text, same_location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeadcountStatus {
    Deficit,
    Surplus,
    Complete,
    Unmapped,
}

impl HeadcountStatus {
    fn from_saldo(saldo: i64) -> Self {
        match saldo {
            0 => Self::Complete,
            s if s > 0 => Self::Surplus,
            _ => Self::Deficit,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Deficit => "deficit",
            Self::Surplus => "surplus",
            Self::Complete => "complete",
            Self::Unmapped => "unmapped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadcountLine {
    pub role: String,
    pub location: String,
    pub target: Option<u32>,
    pub active: u32,
    pub on_leave: u32,
    /// `(active + on_leave) - target`; `None` when no target is configured.
    pub saldo: Option<i64>,
    pub status: HeadcountStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_hours: Option<String>,
}

fn same_role(left: &str, right: &str) -> bool {
    let left = normalize_text(left);
    !left.is_empty() && left == normalize_text(right)
}

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    active: u32,
    on_leave: u32,
}

fn count<'a>(employees: impl IntoIterator<Item = &'a RosterEntry>) -> Counts {
    let mut counts = Counts::default();
    for employee in employees {
        if employee.status.is_active() {
            counts.active += 1;
        } else if employee.status.is_staffed() {
            counts.on_leave += 1;
        }
    }
    counts
}

fn line(role: &str, location: &str, target: Option<u32>, counts: Counts, weekly_hours: Option<String>) -> HeadcountLine {
    let saldo = target.map(|target| i64::from(counts.active + counts.on_leave) - i64::from(target));
    HeadcountLine {
        role: role.trim().to_string(),
        location: location.trim().to_string(),
        target,
        active: counts.active,
        on_leave: counts.on_leave,
        saldo,
        status: saldo.map_or(HeadcountStatus::Unmapped, HeadcountStatus::from_saldo),
        weekly_hours,
    }
}

fn staffed_in<'a>(
    role: &'a str,
    location: &'a str,
    roster: &'a [RosterEntry],
) -> impl Iterator<Item = &'a RosterEntry> + 'a {
    roster.iter().filter(move |employee| {
        employee.status.is_staffed()
            && same_role(role, &employee.role)
            && same_location(location, &employee.location)
    })
}

/// Reconciles one (role, location) pair. Several live targets for the same
/// pair add up.
pub fn reconcile(
    role: &str,
    location: &str,
    targets: &[HeadcountTarget],
    roster: &[RosterEntry],
) -> HeadcountLine {
    let matching: Vec<&HeadcountTarget> = targets
        .iter()
        .filter(|target| !target.archived)
        .filter(|target| same_role(role, &target.role))
        .filter(|target| normalize_text(&target.location) == normalize_text(location))
        .collect();

    let target = (!matching.is_empty()).then(|| matching.iter().map(|target| target.target_count).sum());
    let weekly_hours = match matching.as_slice() {
        [single] => single.weekly_hours.clone(),
        _ => None,
    };
    line(role, location, target, count(staffed_in(role, location, roster)), weekly_hours)
}

/// Every live target, deficits first, followed by one unmapped line per
/// (role, cost center) group that no target covers.
pub fn reconcile_all(targets: &[HeadcountTarget], roster: &[RosterEntry]) -> Vec<HeadcountLine> {
    let mut pairs: BTreeMap<(String, String), (String, String)> = BTreeMap::new();
    for target in targets.iter().filter(|target| !target.archived) {
        let key = (
            normalize_text(&target.role),
            normalize_text(&target.location),
        );
        pairs
            .entry(key)
            .or_insert_with(|| (target.role.clone(), target.location.clone()));
    }

    let mut lines: Vec<HeadcountLine> = pairs
        .values()
        .map(|(role, location)| reconcile(role, location, targets, roster))
        .collect();
    lines.sort_by(|left, right| {
        left.status
            .cmp(&right.status)
            .then_with(|| normalize_text(&left.role).cmp(&normalize_text(&right.role)))
    });

    let mut unmapped: BTreeMap<(String, String), (String, String, Vec<&RosterEntry>)> =
        BTreeMap::new();
    for employee in roster.iter().filter(|employee| employee.status.is_staffed()) {
        let covered = pairs
            .values()
            .any(|(role, location)| same_role(role, &employee.role) && same_location(location, &employee.location));
        if covered {
            continue;
        }
        let location = employee
            .location
            .cost_center
            .clone()
            .or_else(|| employee.location.workplace.clone())
            .unwrap_or_default();
        let key = (normalize_text(&employee.role), normalize_text(&location));
        unmapped
            .entry(key)
            .or_insert_with(|| (employee.role.clone(), location, Vec::new()))
            .2
            .push(employee);
    }

    lines.extend(
        unmapped
            .into_values()
            .map(|(role, location, employees)| line(&role, &location, None, count(employees), None)),
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::vacancy::domain::{
        ContractRef, EmployeeId, EmployeeStatus, Location,
    };
    use chrono::NaiveDate;

    fn employee(id: i64, role: &str, unit: &str, status: &str) -> RosterEntry {
        RosterEntry {
            employee_id: EmployeeId(id),
            name: format!("Employee {id}"),
            role: role.to_string(),
            location: Location {
                cost_center: Some(unit.to_string()),
                workplace: Some(format!("{unit} Annex")),
            },
            contract: ContractRef::default(),
            status: EmployeeStatus::from_code(status),
            status_changed_on: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
            admission_date: None,
        }
    }

    fn target(role: &str, location: &str, count: u32) -> HeadcountTarget {
        HeadcountTarget {
            role: role.to_string(),
            location: location.to_string(),
            target_count: count,
            weekly_hours: None,
            archived: false,
        }
    }

    #[test]
    fn saldo_counts_active_and_on_leave() {
        let roster = vec![
            employee(1, "Nurse", "Unit A", "ACTIVE"),
            employee(2, "nurse ", "Unit A", "ON_LEAVE_MATERNITY"),
            employee(3, "Nurse", "Unit A", "99-DEMITIDO"),
            employee(4, "Nurse", "Unit B", "ACTIVE"),
        ];
        let line = reconcile("Nurse", "Unit A", &[target("Nurse", "Unit A", 3)], &roster);
        assert_eq!(line.active, 1);
        assert_eq!(line.on_leave, 1);
        assert_eq!(line.saldo, Some(-1));
        assert_eq!(line.status, HeadcountStatus::Deficit);
    }

    #[test]
    fn workplace_field_also_matches() {
        let roster = vec![employee(1, "Nurse", "Unit A", "ACTIVE")];
        let line = reconcile("Nurse", "unit a annex", &[target("Nurse", "Unit A Annex", 1)], &roster);
        assert_eq!(line.status, HeadcountStatus::Complete);
    }

    #[test]
    fn accented_spellings_reconcile_together() {
        let roster = vec![
            employee(1, "Técnico", "Unidade São José", "ACTIVE"),
            employee(2, "tecnico", "unidade sao jose", "ACTIVE"),
        ];
        let line = reconcile("TECNICO", "Unidade Sao Jose", &[target("Técnico", "Unidade São José", 2)], &roster);
        assert_eq!(line.active, 2);
        assert_eq!(line.status, HeadcountStatus::Complete);
    }

    #[test]
    fn missing_target_is_unmapped() {
        let line = reconcile("Cook", "Unit A", &[], &[]);
        assert_eq!(line.status, HeadcountStatus::Unmapped);
        assert_eq!(line.saldo, None);
    }

    #[test]
    fn overview_appends_uncovered_groups() {
        let roster = vec![
            employee(1, "Nurse", "Unit A", "ACTIVE"),
            employee(2, "Nurse", "Unit A", "ACTIVE"),
            employee(3, "Cook", "Unit A", "ACTIVE"),
            employee(4, "Cook", "Unit A", "14-ATESTADO"),
        ];
        let mut archived = target("Cook", "Unit A", 5);
        archived.archived = true;
        let lines = reconcile_all(&[target("Nurse", "Unit A", 1), archived], &roster);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].status, HeadcountStatus::Surplus);
        assert_eq!(lines[1].status, HeadcountStatus::Unmapped);
        assert_eq!(lines[1].role, "Cook");
        assert_eq!(lines[1].on_leave, 1);
    }
}
