use std::sync::Arc;

use chrono::NaiveDate;
use staffing_gaps::config::ReconciliationConfig;
use staffing_gaps::workflows::vacancy::domain::{
    Candidate, ContractRef, EmployeeId, EmployeeStatus, EventId, FillAnswer, LedgerEntry,
    Location, OriginType, ResponseKey, RosterEntry,
};
use staffing_gaps::workflows::vacancy::lifecycle::{
    days_open, derive_state, AnalystResponse, LifecycleState, Resolution, ResponsePayload,
};
use staffing_gaps::workflows::vacancy::matching::{rank_candidates, score_candidate, MatchRules, MatchTarget};
use staffing_gaps::workflows::vacancy::{
    ChainError, MemoryStore, ServiceError, StoreLimits, StoreSeed, VacancyService, VacancyStore,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn today() -> NaiveDate {
    date(2025, 3, 1)
}

fn unit_a() -> Location {
    Location {
        cost_center: Some("Unit A".to_string()),
        workplace: None,
    }
}

fn contract_x() -> ContractRef {
    ContractRef {
        contract_id: Some("CT-778".to_string()),
        trade_name: Some("Contract X".to_string()),
    }
}

fn roster_entry(id: i64, name: &str, status: &str, changed_on: NaiveDate) -> RosterEntry {
    RosterEntry {
        employee_id: EmployeeId(id),
        name: name.to_string(),
        role: "Nurse".to_string(),
        location: unit_a(),
        contract: contract_x(),
        status: EmployeeStatus::from_code(status),
        status_changed_on: changed_on,
        admission_date: None,
    }
}

/// Event #100 for a terminated nurse in Unit A, plus a second event #200 used
/// for chain checks.
fn service() -> (VacancyService<MemoryStore>, Arc<MemoryStore>) {
    let seed = StoreSeed {
        roster: vec![
            roster_entry(1, "Alice Moreira", "TERMINATED", date(2025, 1, 5)),
            roster_entry(2, "Paulo Reis", "TERMINATED", date(2025, 2, 3)),
        ],
        ledger: vec![
            LedgerEntry {
                event_id: EventId(100),
                employee_id: EmployeeId(1),
                event_date: date(2025, 1, 5),
                origin_status: "TERMINATED".to_string(),
            },
            LedgerEntry {
                event_id: EventId(200),
                employee_id: EmployeeId(2),
                event_date: date(2025, 2, 3),
                origin_status: "TERMINATED".to_string(),
            },
        ],
        ..StoreSeed::default()
    };
    let store = Arc::new(MemoryStore::seeded(StoreLimits::default(), seed));
    let service = VacancyService::new(store.clone(), &ReconciliationConfig::default());
    (service, store)
}

fn key(id: i64) -> ResponseKey {
    ResponseKey::new(EventId(id), OriginType::Termination)
}

fn opened_payload() -> ResponsePayload {
    ResponsePayload {
        opened_vacancy: Some(true),
        opened_date: Some(date(2025, 1, 10)),
        ..ResponsePayload::default()
    }
}

fn filled_payload() -> ResponsePayload {
    ResponsePayload {
        vacancy_filled: Some(FillAnswer::Yes),
        closed_date: Some(date(2025, 2, 1)),
        substitute_name: Some("Jane Doe".to_string()),
        ..ResponsePayload::default()
    }
}

async fn state_of(service: &VacancyService<MemoryStore>, id: i64) -> (LifecycleState, Option<i64>) {
    let partition = service.ingest().await;
    let (event, response) = partition.find(key(id)).expect("event ingested");
    let resolution = response
        .map(|response| response.resolution.clone())
        .unwrap_or(Resolution::Unanswered);
    (
        derive_state(event, response),
        days_open(event, &resolution, today()),
    )
}

#[tokio::test]
async fn unanswered_event_is_pending_response() {
    let (service, _) = service();

    let (state, days) = state_of(&service, 100).await;

    assert_eq!(state, LifecycleState::PendingResponse);
    assert_eq!(days, Some((today() - date(2025, 1, 5)).num_days()));
}

#[tokio::test]
async fn opened_event_counts_from_opened_date() {
    let (service, _) = service();
    service
        .respond(key(100), &opened_payload(), today())
        .await
        .expect("open accepted");

    let (state, days) = state_of(&service, 100).await;

    assert_eq!(state, LifecycleState::Open);
    assert_eq!(days, Some((today() - date(2025, 1, 10)).num_days()));
}

#[tokio::test]
async fn filled_event_counts_open_to_close() {
    let (service, _) = service();
    service
        .respond(key(100), &opened_payload(), today())
        .await
        .expect("open accepted");
    service
        .respond(key(100), &filled_payload(), today())
        .await
        .expect("fill accepted");

    let (state, days) = state_of(&service, 100).await;

    assert_eq!(state, LifecycleState::Filled);
    assert_eq!(days, Some(22));
}

#[test]
fn full_match_outranks_role_only_match() {
    let rules = MatchRules::default();
    let target = MatchTarget {
        role: "Nurse".to_string(),
        location: "Unit A".to_string(),
        contract: contract_x(),
    };
    let jane = Candidate {
        id: EmployeeId(30),
        name: "Jane".to_string(),
        role: "Nurse".to_string(),
        location: unit_a(),
        contract: contract_x(),
        admission_date: None,
    };
    let bob = Candidate {
        id: EmployeeId(31),
        name: "Bob".to_string(),
        role: "Nurse".to_string(),
        location: Location {
            cost_center: Some("Unit B".to_string()),
            workplace: None,
        },
        contract: ContractRef {
            contract_id: Some("CT-100".to_string()),
            trade_name: None,
        },
        admission_date: None,
    };

    assert_eq!(score_candidate(&rules, &target, &jane), 10_000);
    assert_eq!(score_candidate(&rules, &target, &bob), 1_000);

    let ranked = rank_candidates(&rules, "", &target, &[bob, jane]);
    assert_eq!(ranked[0].candidate.name, "Jane");
    assert!(ranked[0].score > ranked[1].score);
}

#[test]
fn scoring_is_monotone_in_matched_criteria() {
    let rules = MatchRules::default();
    let target = MatchTarget {
        role: "Nurse".to_string(),
        location: "Unit A".to_string(),
        contract: contract_x(),
    };
    let candidate = |role: &str, unit: &str, contract: &str| Candidate {
        id: EmployeeId(1),
        name: "Someone".to_string(),
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
    };

    let scores: Vec<u32> = [
        candidate("Nurse", "Unit A", "CT-778"),
        candidate("Nurse", "Unit A", "CT-100"),
        candidate("Nurse", "Unit B", "CT-778"),
        candidate("Nurse", "Unit B", "CT-100"),
        candidate("Cook", "Unit A", "CT-778"),
    ]
    .iter()
    .map(|candidate| score_candidate(&rules, &target, candidate))
    .collect();

    assert!(scores.windows(2).all(|pair| pair[0] > pair[1]), "{scores:?}");
}

#[tokio::test]
async fn unarchiving_returns_to_the_prior_state() {
    let (service, _) = service();
    service
        .respond(key(100), &opened_payload(), today())
        .await
        .expect("open accepted");

    service.set_archived(key(100), true).await.expect("archived");
    assert_eq!(state_of(&service, 100).await.0, LifecycleState::Archived);

    service.set_archived(key(100), false).await.expect("unarchived");
    assert_eq!(state_of(&service, 100).await.0, LifecycleState::Open);
}

#[tokio::test]
async fn filled_response_reads_back_with_same_closed_date() {
    let (service, store) = service();
    service
        .respond(key(100), &opened_payload(), today())
        .await
        .expect("open accepted");
    service
        .respond(key(100), &filled_payload(), today())
        .await
        .expect("fill accepted");

    let rows = store
        .responses_for_events(&[EventId(100)])
        .await
        .expect("store reachable");
    assert_eq!(rows.len(), 1);
    let stored = AnalystResponse::from_stored(rows[0].clone());

    assert_eq!(stored.resolution.closed_on(), Some(date(2025, 2, 1)));
    assert_eq!(
        stored.resolution.substitute().and_then(|s| s.name.as_deref()),
        Some("Jane Doe")
    );
}

#[tokio::test]
async fn same_payload_twice_keeps_one_response_and_state() {
    let (service, store) = service();

    let first = service
        .respond(key(100), &opened_payload(), today())
        .await
        .expect("first save");
    let second = service
        .respond(key(100), &opened_payload(), today())
        .await
        .expect("second save");

    assert_eq!(first, second);
    let rows = store
        .responses_for_events(&[EventId(100)])
        .await
        .expect("store reachable");
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn cycle_is_rejected_and_chain_is_unchanged() {
    let (service, _) = service();
    service
        .set_parent(key(200), Some(EventId(100)))
        .await
        .expect("link accepted");
    service
        .set_parent(key(200), Some(EventId(100)))
        .await
        .expect("relinking is idempotent");
    let before = service.chain(EventId(100)).await.expect("chain builds");
    assert_eq!(before.entries.len(), 2);

    match service.set_parent(key(100), Some(EventId(200))).await {
        Err(ServiceError::Chain(ChainError::Cycle { .. })) => {}
        other => panic!("expected cycle rejection, got {other:?}"),
    }

    let after = service.chain(EventId(100)).await.expect("chain builds");
    assert_eq!(before, after);
}
