use std::collections::{BTreeMap, HashMap, HashSet};

use futures::future::join_all;
use serde::Serialize;

use super::domain::{
    EmployeeId, EmployeeStatus, EventId, LedgerEntry, ManualVacancy, OriginType, ResponseKey,
    RosterEntry, VacancyEvent,
};
use super::lifecycle::{AnalystResponse, ResponseRow};
use super::store::{RosterFilter, VacancyStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionStage {
    Roster,
    Ledger,
    Responses,
    ManualVacancies,
}

/// A store call that failed; the pass continued without its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFailure {
    pub stage: IngestionStage,
    pub attempted: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RespondedEvent {
    pub event: VacancyEvent,
    pub response: AnalystResponse,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionPartition {
    pub pending: Vec<VacancyEvent>,
    pub responded: Vec<RespondedEvent>,
    pub manual: Vec<ManualVacancy>,
    /// Roster entries left out because one of their lookups failed.
    pub unresolved: usize,
    pub failures: Vec<ChunkFailure>,
}

impl IngestionPartition {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Every event with its response, if any.
    pub fn working_set(&self) -> impl Iterator<Item = (&VacancyEvent, Option<&AnalystResponse>)> {
        self.pending
            .iter()
            .map(|event| (event, None))
            .chain(
                self.responded
                    .iter()
                    .map(|responded| (&responded.event, Some(&responded.response))),
            )
    }

    pub fn find(&self, key: ResponseKey) -> Option<(&VacancyEvent, Option<&AnalystResponse>)> {
        self.working_set().find(|(event, _)| event.key() == key)
    }

    pub fn find_event(&self, event_id: EventId) -> Option<(&VacancyEvent, Option<&AnalystResponse>)> {
        self.working_set().find(|(event, _)| event.id == event_id)
    }
}

fn ledger_origin(entry: &LedgerEntry) -> Option<OriginType> {
    EmployeeStatus::from_code(&entry.origin_status).vacancy_origin()
}

/// Events built from one roster snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltEvents {
    pub events: Vec<VacancyEvent>,
    /// Roster entries whose synthetic id clashed with a ledger event.
    pub collisions: usize,
}

fn draft_event(
    employee: &RosterEntry,
    by_employee: &HashMap<EmployeeId, Vec<&LedgerEntry>>,
) -> Option<VacancyEvent> {
    let origin_type = employee.status.vacancy_origin()?;
    let ledger_entry = by_employee
        .get(&employee.employee_id)
        .and_then(|entries| {
            entries
                .iter()
                .filter(|entry| ledger_origin(entry) == Some(origin_type))
                .max_by_key(|entry| (entry.event_date, entry.event_id))
        })
        .copied();

    let (id, event_date, needs_creation) = match ledger_entry {
        Some(entry) => (entry.event_id, entry.event_date, false),
        None => (
            employee.employee_id.fallback_event_id(),
            employee.status_changed_on,
            true,
        ),
    };

    Some(VacancyEvent {
        id,
        origin_type,
        employee_id: Some(employee.employee_id),
        employee_name: employee.name.clone(),
        role: employee.role.clone(),
        location: employee.location.clone(),
        contract: employee.contract.clone(),
        event_date,
        origin_status: match &employee.status {
            EmployeeStatus::OnLeave(code) => code.clone(),
            _ => ledger_entry
                .map(|entry| entry.origin_status.clone())
                .unwrap_or_else(|| "TERMINATED".to_string()),
        },
        needs_creation,
    })
}

/// Turns vacancy-source roster rows into events.
///
/// Each entry takes the most recent ledger event of the same origin; without
/// one, the employee id stands in as a synthetic event id. A real ledger event
/// always wins its key: a synthetic id landing on it is dropped and counted in
/// `collisions` so it never borrows that event's response.
pub fn build_events(roster: &[RosterEntry], ledger: &[LedgerEntry]) -> BuiltEvents {
    let mut by_employee: HashMap<EmployeeId, Vec<&LedgerEntry>> = HashMap::new();
    for entry in ledger {
        by_employee.entry(entry.employee_id).or_default().push(entry);
    }

    let drafts: Vec<VacancyEvent> = roster
        .iter()
        .filter_map(|employee| draft_event(employee, &by_employee))
        .collect();
    let ledger_keys: HashSet<ResponseKey> = drafts
        .iter()
        .filter(|event| !event.needs_creation)
        .map(VacancyEvent::key)
        .collect();

    let mut built = BuiltEvents::default();
    let mut seen = HashSet::new();
    for event in drafts {
        let key = event.key();
        if event.needs_creation && ledger_keys.contains(&key) {
            tracing::warn!(
                event = %key,
                employee = ?event.employee_id,
                "synthetic event id collides with a ledger event; roster entry left unresolved"
            );
            built.collisions += 1;
            continue;
        }
        if seen.insert(key) {
            built.events.push(event);
        }
    }
    built
}

/// Splits events by whether a response exists under their exact key.
pub fn split_by_response(
    events: Vec<VacancyEvent>,
    responses: &[ResponseRow],
) -> (Vec<VacancyEvent>, Vec<RespondedEvent>) {
    let by_key: BTreeMap<ResponseKey, &ResponseRow> =
        responses.iter().map(|row| (row.key(), row)).collect();

    let mut pending = Vec::new();
    let mut responded = Vec::new();
    for event in events {
        match by_key.get(&event.key()) {
            Some(row) => responded.push(RespondedEvent {
                response: AnalystResponse::from_stored((*row).clone()),
                event,
            }),
            None => pending.push(event),
        }
    }
    (pending, responded)
}

/// Pure partition over already-fetched tables.
pub fn partition_events(
    roster: &[RosterEntry],
    ledger: &[LedgerEntry],
    responses: &[ResponseRow],
) -> IngestionPartition {
    let built = build_events(roster, ledger);
    let (pending, responded) = split_by_response(built.events, responses);
    IngestionPartition {
        pending,
        responded,
        unresolved: built.collisions,
        ..IngestionPartition::default()
    }
}

/// Fetches the roster, ledger, and responses in bounded chunks and partitions
/// the result. A failing chunk shrinks the result instead of aborting.
#[derive(Debug, Clone, Copy)]
pub struct EventIngestor {
    chunk_size: usize,
}

impl EventIngestor {
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    fn failure(stage: IngestionStage, attempted: usize, error: impl ToString) -> ChunkFailure {
        let failure = ChunkFailure {
            stage,
            attempted,
            error: error.to_string(),
        };
        tracing::warn!(
            stage = ?failure.stage,
            attempted = failure.attempted,
            error = %failure.error,
            "ingestion chunk failed"
        );
        failure
    }

    async fn load_roster<S: VacancyStore + ?Sized>(
        store: &S,
        failures: &mut Vec<ChunkFailure>,
    ) -> Vec<RosterEntry> {
        let page_size = store.limits().max_page_rows.max(1);
        let mut roster = Vec::new();
        loop {
            match store
                .roster_page(RosterFilter::VacancySources, roster.len(), page_size)
                .await
            {
                Ok(page) => {
                    let done = page.len() < page_size;
                    roster.extend(page);
                    if done {
                        break;
                    }
                }
                Err(error) => {
                    failures.push(Self::failure(IngestionStage::Roster, page_size, error));
                    break;
                }
            }
        }
        roster
    }

    pub async fn run<S: VacancyStore + ?Sized>(&self, store: &S) -> IngestionPartition {
        let chunk_size = self.chunk_size.clamp(1, store.limits().max_in_list.max(1));
        let mut failures = Vec::new();

        let roster = Self::load_roster(store, &mut failures).await;

        let employee_ids: Vec<EmployeeId> = roster
            .iter()
            .map(|entry| entry.employee_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let ledger_chunks: Vec<&[EmployeeId]> = employee_ids.chunks(chunk_size).collect();
        let ledger_results =
            join_all(ledger_chunks.iter().map(|chunk| store.ledger_for_employees(chunk))).await;

        let mut ledger = Vec::new();
        let mut failed_employees: HashSet<EmployeeId> = HashSet::new();
        for (chunk, result) in ledger_chunks.iter().zip(ledger_results) {
            match result {
                Ok(rows) => ledger.extend(rows),
                Err(error) => {
                    failures.push(Self::failure(IngestionStage::Ledger, chunk.len(), error));
                    failed_employees.extend(chunk.iter().copied());
                }
            }
        }

        let resolved_roster: Vec<RosterEntry> = roster
            .iter()
            .filter(|entry| !failed_employees.contains(&entry.employee_id))
            .cloned()
            .collect();
        let BuiltEvents { events, collisions } = build_events(&resolved_roster, &ledger);

        let event_ids: Vec<EventId> = events
            .iter()
            .map(|event| event.id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let response_chunks: Vec<&[EventId]> = event_ids.chunks(chunk_size).collect();
        let response_results =
            join_all(response_chunks.iter().map(|chunk| store.responses_for_events(chunk))).await;

        let mut responses = Vec::new();
        let mut failed_events: HashSet<EventId> = HashSet::new();
        for (chunk, result) in response_chunks.iter().zip(response_results) {
            match result {
                Ok(rows) => responses.extend(rows),
                Err(error) => {
                    failures.push(Self::failure(IngestionStage::Responses, chunk.len(), error));
                    failed_events.extend(chunk.iter().copied());
                }
            }
        }

        let (resolved_events, dropped_events): (Vec<VacancyEvent>, Vec<VacancyEvent>) = events
            .into_iter()
            .partition(|event| !failed_events.contains(&event.id));
        let unresolved = roster.len() - resolved_roster.len() + collisions + dropped_events.len();
        let (pending, responded) = split_by_response(resolved_events, &responses);

        let manual = match store.manual_vacancies().await {
            Ok(manual) => manual,
            Err(error) => {
                failures.push(Self::failure(IngestionStage::ManualVacancies, 0, error));
                Vec::new()
            }
        };

        tracing::info!(
            roster = roster.len(),
            pending = pending.len(),
            responded = responded.len(),
            manual = manual.len(),
            unresolved,
            failed_chunks = failures.len(),
            "ingestion pass finished"
        );

        IngestionPartition {
            pending,
            responded,
            manual,
            unresolved,
            failures,
        }
    }
}
