use std::sync::Arc;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::config::ReconciliationConfig;
use crate::workflows::vacancy::domain::{
    AnalystAssignment, AnalystRef, Candidate, ContractRef, EmployeeId, EmployeeStatus, EventId,
    FillAnswer, HeadcountTarget, LedgerDraft, LedgerEntry, Location, ManualVacancy,
    ManualVacancyDraft, OriginType, ResponseKey, RosterEntry,
};
use crate::workflows::vacancy::lifecycle::{ResponsePayload, ResponseRow};
use crate::workflows::vacancy::store::{
    MemoryStore, RosterFilter, StoreError, StoreLimits, StoreSeed, VacancyStore,
};
use crate::workflows::vacancy::{vacancy_router, VacancyService};

pub(super) const TERMINATED_EVENT: EventId = EventId(500);
pub(super) const LEAVE_EMPLOYEE: EmployeeId = EmployeeId(11);

pub(super) fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).expect("valid date")
}

pub(super) fn today() -> NaiveDate {
    date(3, 15)
}

pub(super) fn employee(
    id: i64,
    name: &str,
    role: &str,
    cost_center: &str,
    status: &str,
    changed_on: NaiveDate,
) -> RosterEntry {
    RosterEntry {
        employee_id: EmployeeId(id),
        name: name.to_string(),
        role: role.to_string(),
        location: Location {
            cost_center: Some(cost_center.to_string()),
            workplace: None,
        },
        contract: ContractRef {
            contract_id: Some("C-0042".to_string()),
            trade_name: Some("Hospital Norte".to_string()),
        },
        status: EmployeeStatus::from_code(status),
        status_changed_on: changed_on,
        admission_date: None,
    }
}

/// Ana left with a ledger event, Bruno went on leave with none yet, Carla and
/// Carlos are active.
pub(super) fn seed() -> StoreSeed {
    let mut carla = employee(20, "Carla Souza", "Nurse", "CC-1", "ACTIVE", date(1, 1));
    carla.admission_date = Some(NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date"));
    let mut carlos = employee(21, "Carlos Dias", "Technician", "CC-2", "ACTIVE", date(1, 1));
    carlos.contract = ContractRef {
        contract_id: Some("C-0099".to_string()),
        trade_name: None,
    };

    StoreSeed {
        roster: vec![
            employee(10, "Ana Lima", "Nurse", "CC-1", "99-DEMITIDO", date(1, 10)),
            employee(11, "Bruno Costa", "Nurse", "CC-1", "LICENCA MATERNIDADE", date(2, 1)),
            carla,
            carlos,
        ],
        ledger: vec![LedgerEntry {
            event_id: TERMINATED_EVENT,
            employee_id: EmployeeId(10),
            event_date: date(1, 10),
            origin_status: "99-DEMITIDO".to_string(),
        }],
        targets: vec![HeadcountTarget {
            role: "Nurse".to_string(),
            location: "CC-1".to_string(),
            target_count: 3,
            weekly_hours: Some("36h".to_string()),
            archived: false,
        }],
        ..StoreSeed::default()
    }
}

pub(super) fn terminated_key() -> ResponseKey {
    ResponseKey::new(TERMINATED_EVENT, OriginType::Termination)
}

pub(super) fn leave_key() -> ResponseKey {
    ResponseKey::new(LEAVE_EMPLOYEE.fallback_event_id(), OriginType::Leave)
}

pub(super) fn analyst() -> AnalystRef {
    AnalystRef {
        id: 7,
        name: "Dora Analyst".to_string(),
    }
}

pub(super) fn open_payload(opened_on: NaiveDate) -> ResponsePayload {
    ResponsePayload {
        opened_vacancy: Some(true),
        opened_date: Some(opened_on),
        vacancy_filled: Some(FillAnswer::No),
        analyst: Some(analyst()),
        ..ResponsePayload::default()
    }
}

pub(super) fn filled_payload(closed_on: NaiveDate) -> ResponsePayload {
    ResponsePayload {
        vacancy_filled: Some(FillAnswer::Yes),
        closed_date: Some(closed_on),
        ..ResponsePayload::default()
    }
}

pub(super) fn build_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::seeded(StoreLimits::default(), seed()))
}

pub(super) fn build_service() -> (Arc<VacancyService<MemoryStore>>, Arc<MemoryStore>) {
    let store = build_store();
    let service = Arc::new(VacancyService::new(
        store.clone(),
        &ReconciliationConfig::default(),
    ));
    (service, store)
}

pub(super) fn router_with_service(service: Arc<VacancyService<MemoryStore>>) -> axum::Router {
    vacancy_router(service)
}

pub(super) struct UnavailableStore;

fn offline() -> StoreError {
    StoreError::Unavailable("database offline".to_string())
}

#[async_trait]
impl VacancyStore for UnavailableStore {
    fn limits(&self) -> StoreLimits {
        StoreLimits::default()
    }

    async fn roster_page(
        &self,
        _filter: RosterFilter,
        _offset: usize,
        _limit: usize,
    ) -> Result<Vec<RosterEntry>, StoreError> {
        Err(offline())
    }

    async fn ledger_for_employees(
        &self,
        _employees: &[EmployeeId],
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        Err(offline())
    }

    async fn create_ledger_event(&self, _draft: LedgerDraft) -> Result<LedgerEntry, StoreError> {
        Err(offline())
    }

    async fn responses_for_events(
        &self,
        _events: &[EventId],
    ) -> Result<Vec<ResponseRow>, StoreError> {
        Err(offline())
    }

    async fn upsert_response(&self, _row: ResponseRow) -> Result<ResponseRow, StoreError> {
        Err(offline())
    }

    async fn responses_with_parent_links(&self) -> Result<Vec<ResponseRow>, StoreError> {
        Err(offline())
    }

    async fn manual_vacancies(&self) -> Result<Vec<ManualVacancy>, StoreError> {
        Err(offline())
    }

    async fn insert_manual_vacancy(
        &self,
        _draft: ManualVacancyDraft,
    ) -> Result<ManualVacancy, StoreError> {
        Err(offline())
    }

    async fn delete_manual_vacancy(&self, _id: i64) -> Result<(), StoreError> {
        Err(offline())
    }

    async fn assignments(&self) -> Result<Vec<AnalystAssignment>, StoreError> {
        Err(offline())
    }

    async fn insert_assignment(
        &self,
        _assignment: AnalystAssignment,
    ) -> Result<AnalystAssignment, StoreError> {
        Err(offline())
    }

    async fn headcount_targets(&self) -> Result<Vec<HeadcountTarget>, StoreError> {
        Err(offline())
    }

    async fn search_candidates(
        &self,
        _fragment: &str,
        _limit: usize,
    ) -> Result<Vec<Candidate>, StoreError> {
        Err(offline())
    }
}

pub(super) fn unavailable_service() -> Arc<VacancyService<UnavailableStore>> {
    Arc::new(VacancyService::new(
        Arc::new(UnavailableStore),
        &ReconciliationConfig::default(),
    ))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn json_request(method: &str, uri: &str, body: &Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("serialize body"),
        ))
        .expect("build request")
}
