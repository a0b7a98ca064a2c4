use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{RosterFilter, StoreError, StoreLimits, VacancyStore};
use crate::workflows::vacancy::domain::{
    AnalystAssignment, Candidate, EmployeeId, EventId, HeadcountTarget, LedgerDraft, LedgerEntry,
    ManualVacancy, ManualVacancyDraft, ResponseKey, RosterEntry,
};
use crate::workflows::vacancy::lifecycle::ResponseRow;
use crate::workflows::vacancy::matching::normalize_text;

/// Table contents used to seed a [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct StoreSeed {
    pub roster: Vec<RosterEntry>,
    pub ledger: Vec<LedgerEntry>,
    pub responses: Vec<ResponseRow>,
    pub targets: Vec<HeadcountTarget>,
    pub assignments: Vec<AnalystAssignment>,
    pub manual_vacancies: Vec<ManualVacancy>,
}

#[derive(Debug, Default)]
struct Tables {
    roster: Vec<RosterEntry>,
    ledger: Vec<LedgerEntry>,
    responses: BTreeMap<ResponseKey, ResponseRow>,
    targets: Vec<HeadcountTarget>,
    assignments: Vec<AnalystAssignment>,
    manual_vacancies: BTreeMap<i64, ManualVacancy>,
}

/// In-process store that enforces the same per-call limits as the remote one.
#[derive(Debug)]
pub struct MemoryStore {
    limits: StoreLimits,
    tables: Mutex<Tables>,
    largest_request: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(StoreLimits::default())
    }
}

impl MemoryStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self::seeded(limits, StoreSeed::default())
    }

    pub fn seeded(limits: StoreLimits, seed: StoreSeed) -> Self {
        let tables = Tables {
            roster: seed.roster,
            ledger: seed.ledger,
            responses: seed
                .responses
                .into_iter()
                .map(|row| (row.key(), row))
                .collect(),
            targets: seed.targets,
            assignments: seed.assignments,
            manual_vacancies: seed
                .manual_vacancies
                .into_iter()
                .map(|vacancy| (vacancy.id, vacancy))
                .collect(),
        };
        Self {
            limits,
            tables: Mutex::new(tables),
            largest_request: AtomicUsize::new(0),
        }
    }

    /// Largest id list or page size any call has asked for so far.
    pub fn largest_request(&self) -> usize {
        self.largest_request.load(Ordering::Relaxed)
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn check(&self, requested: usize, max: usize) -> Result<(), StoreError> {
        self.largest_request.fetch_max(requested, Ordering::Relaxed);
        if requested > max {
            return Err(StoreError::LimitExceeded { requested, max });
        }
        Ok(())
    }
}

fn next_event_id(tables: &Tables) -> EventId {
    let ledger_max = tables.ledger.iter().map(|entry| entry.event_id.0).max();
    let employee_max = tables.roster.iter().map(|entry| entry.employee_id.0).max();
    EventId(ledger_max.max(employee_max).unwrap_or(0) + 1)
}

#[async_trait]
impl VacancyStore for MemoryStore {
    fn limits(&self) -> StoreLimits {
        self.limits
    }

    async fn roster_page(
        &self,
        filter: RosterFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RosterEntry>, StoreError> {
        self.check(limit, self.limits.max_page_rows)?;
        let tables = self.tables()?;
        Ok(tables
            .roster
            .iter()
            .filter(|entry| match filter {
                RosterFilter::VacancySources => entry.status.vacancy_origin().is_some(),
                RosterFilter::All => true,
            })
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ledger_for_employees(
        &self,
        employees: &[EmployeeId],
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        self.check(employees.len(), self.limits.max_in_list)?;
        let wanted: HashSet<&EmployeeId> = employees.iter().collect();
        let tables = self.tables()?;
        Ok(tables
            .ledger
            .iter()
            .filter(|entry| wanted.contains(&entry.employee_id))
            .cloned()
            .collect())
    }

    async fn create_ledger_event(&self, draft: LedgerDraft) -> Result<LedgerEntry, StoreError> {
        let mut tables = self.tables()?;
        let entry = LedgerEntry {
            event_id: next_event_id(&tables),
            employee_id: draft.employee_id,
            event_date: draft.event_date,
            origin_status: draft.origin_status,
        };
        tables.ledger.push(entry.clone());
        Ok(entry)
    }

    async fn responses_for_events(
        &self,
        events: &[EventId],
    ) -> Result<Vec<ResponseRow>, StoreError> {
        self.check(events.len(), self.limits.max_in_list)?;
        let wanted: HashSet<&EventId> = events.iter().collect();
        let tables = self.tables()?;
        Ok(tables
            .responses
            .values()
            .filter(|row| wanted.contains(&row.event_id))
            .cloned()
            .collect())
    }

    async fn upsert_response(&self, row: ResponseRow) -> Result<ResponseRow, StoreError> {
        let mut tables = self.tables()?;
        tables.responses.insert(row.key(), row.clone());
        Ok(row)
    }

    async fn responses_with_parent_links(&self) -> Result<Vec<ResponseRow>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .responses
            .values()
            .filter(|row| row.parent_event_id.is_some())
            .take(self.limits.max_page_rows)
            .cloned()
            .collect())
    }

    async fn manual_vacancies(&self) -> Result<Vec<ManualVacancy>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .manual_vacancies
            .values()
            .take(self.limits.max_page_rows)
            .cloned()
            .collect())
    }

    async fn insert_manual_vacancy(
        &self,
        draft: ManualVacancyDraft,
    ) -> Result<ManualVacancy, StoreError> {
        let mut tables = self.tables()?;
        let id = tables
            .manual_vacancies
            .keys()
            .next_back()
            .map_or(1, |last| last + 1);
        let vacancy = ManualVacancy {
            id,
            kind: draft.kind,
            role: draft.role,
            location: draft.location,
            contract: draft.contract,
            opened_on: draft.opened_on,
            note: draft.note,
        };
        tables.manual_vacancies.insert(id, vacancy.clone());
        Ok(vacancy)
    }

    async fn delete_manual_vacancy(&self, id: i64) -> Result<(), StoreError> {
        let mut tables = self.tables()?;
        tables
            .manual_vacancies
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn assignments(&self) -> Result<Vec<AnalystAssignment>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .assignments
            .iter()
            .take(self.limits.max_page_rows)
            .cloned()
            .collect())
    }

    async fn insert_assignment(
        &self,
        assignment: AnalystAssignment,
    ) -> Result<AnalystAssignment, StoreError> {
        let mut tables = self.tables()?;
        let duplicate = tables.assignments.iter().any(|existing| {
            existing.active
                && existing.event_id == assignment.event_id
                && existing.analyst.id == assignment.analyst.id
        });
        if duplicate {
            return Err(StoreError::Conflict);
        }
        tables.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn headcount_targets(&self) -> Result<Vec<HeadcountTarget>, StoreError> {
        let tables = self.tables()?;
        Ok(tables
            .targets
            .iter()
            .take(self.limits.max_page_rows)
            .cloned()
            .collect())
    }

    async fn search_candidates(
        &self,
        fragment: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, StoreError> {
        self.check(limit, self.limits.max_page_rows)?;
        let fragment = normalize_text(fragment);
        let tables = self.tables()?;
        Ok(tables
            .roster
            .iter()
            .filter(|entry| entry.status.is_active())
            .filter(|entry| fragment.is_empty() || normalize_text(&entry.name).contains(&fragment))
            .take(limit)
            .map(Candidate::from)
            .collect())
    }
}
