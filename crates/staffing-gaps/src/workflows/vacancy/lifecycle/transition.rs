use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::domain::{AnalystRef, EmployeeId, FillAnswer, ResponseKey};
use super::super::validation::{FieldError, ValidationCode, ValidationErrors};
use super::record::{AnalystResponse, NotFoundMark, Resolution, ResponseRow};
use super::state::{base_state, LifecycleState};

/// Partial analyst edit. Absent fields keep the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    #[serde(default)]
    pub opened_vacancy: Option<bool>,
    #[serde(default)]
    pub opened_date: Option<NaiveDate>,
    #[serde(default)]
    pub vacancy_filled: Option<FillAnswer>,
    #[serde(default)]
    pub closed_date: Option<NaiveDate>,
    #[serde(default)]
    pub substitute_id: Option<EmployeeId>,
    #[serde(default)]
    pub substitute_name: Option<String>,
    #[serde(default)]
    pub pending_confirmation: Option<bool>,
    #[serde(default)]
    pub analyst: Option<AnalystRef>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ResponsePayload {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Merges a payload into a stored row.
///
/// Answering "not opened" drops the stale open/fill fields of the stored row,
/// and answering NAO drops its closed date. Fields sent in the same payload are
/// kept so that contradictory edits still reach validation.
pub fn apply_payload(mut row: ResponseRow, payload: &ResponsePayload) -> ResponseRow {
    if payload.opened_vacancy == Some(false) {
        row.opened_date = None;
        row.vacancy_filled = None;
        row.closed_date = None;
        row.pending_confirmation = false;
    }
    if payload.vacancy_filled == Some(FillAnswer::No) {
        row.closed_date = None;
    }
    if payload.vacancy_filled == Some(FillAnswer::Yes) && payload.pending_confirmation.is_none() {
        row.pending_confirmation = false;
    }

    if let Some(opened) = payload.opened_vacancy {
        row.opened_vacancy = Some(opened);
    }
    if let Some(opened_date) = payload.opened_date {
        row.opened_date = Some(opened_date);
        if row.opened_vacancy.is_none() {
            row.opened_vacancy = Some(true);
        }
    }
    if let Some(answer) = payload.vacancy_filled {
        row.vacancy_filled = Some(answer);
    }
    if let Some(closed_date) = payload.closed_date {
        row.closed_date = Some(closed_date);
    }
    if let Some(substitute_id) = payload.substitute_id {
        row.substitute_id = Some(substitute_id);
    }
    if let Some(name) = &payload.substitute_name {
        row.substitute_name = Some(name.trim().to_string()).filter(|name| !name.is_empty());
    }
    if let Some(pending) = payload.pending_confirmation {
        row.pending_confirmation = pending;
    }
    if let Some(analyst) = &payload.analyst {
        row.analyst_id = Some(analyst.id);
        row.analyst_name = Some(analyst.name.clone());
    }
    if let Some(note) = &payload.note {
        row.note = Some(note.clone()).filter(|note| !note.trim().is_empty());
    }
    row
}

fn trigger_field(target: LifecycleState) -> &'static str {
    match target {
        LifecycleState::PendingConfirmation => "pending_confirmation",
        LifecycleState::Filled => "vacancy_filled",
        _ => "opened_vacancy",
    }
}

/// Checks a move between computed states. `to` is described by the resolution
/// it would persist.
pub fn check_transition(from: LifecycleState, to: &Resolution) -> Result<(), FieldError> {
    use LifecycleState::*;

    let target = base_state(to);
    let allowed = from == target
        || match (from, target) {
            (PendingResponse, NotOpened | Open) => true,
            (PendingResponse, PendingConfirmation | Filled) => to.opened_on().is_some(),
            (NotOpened, Open) => true,
            (Open, NotOpened | PendingConfirmation | Filled) => true,
            (PendingConfirmation, Filled | Open) => true,
            (Filled, Open) => true,
            _ => false,
        };

    if allowed {
        Ok(())
    } else {
        Err(FieldError::new(
            trigger_field(target),
            ValidationCode::InvalidTransition,
            format!("cannot move from {from} to {target}"),
        ))
    }
}

/// Outcome of validating an analyst edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedResponse {
    pub from: LifecycleState,
    pub to: LifecycleState,
    pub response: AnalystResponse,
}

/// Builds the response to persist for `payload`, or the field errors that
/// block it. Nothing is written here.
pub fn plan_response(
    key: ResponseKey,
    existing: Option<ResponseRow>,
    payload: &ResponsePayload,
    today: NaiveDate,
) -> Result<PlannedResponse, ValidationErrors> {
    let stored = existing.unwrap_or_else(|| ResponseRow::empty(key));
    let from = base_state(&AnalystResponse::from_stored(stored.clone()).resolution);

    let merged = apply_payload(stored, payload);
    let mut response = AnalystResponse::try_from(merged)?;
    check_transition(from, &response.resolution)?;

    response.responded_on = Some(today);
    Ok(PlannedResponse {
        from,
        to: base_state(&response.resolution),
        response,
    })
}

/// Moves PENDING_CONFIRMATION to FILLED. A FILLED record is returned unchanged.
pub fn confirm_fill(
    response: &AnalystResponse,
    closed_on: NaiveDate,
) -> Result<AnalystResponse, ValidationErrors> {
    match &response.resolution {
        Resolution::Filled { .. } => Ok(response.clone()),
        Resolution::PendingConfirmation {
            opened_on,
            substitute,
        } => {
            if let Some(opened) = opened_on {
                if closed_on < *opened {
                    return Err(FieldError::new(
                        "closed_date",
                        ValidationCode::DateOrder,
                        format!("closed_date {closed_on} precedes opened_date {opened}"),
                    )
                    .into());
                }
            }
            let mut confirmed = response.clone();
            confirmed.resolution = Resolution::Filled {
                opened_on: *opened_on,
                closed_on,
                substitute: Some(substitute.clone()),
            };
            Ok(confirmed)
        }
        other => Err(FieldError::new(
            "pending_confirmation",
            ValidationCode::InvalidTransition,
            format!(
                "only pending confirmations can be confirmed, event is {}",
                base_state(other)
            ),
        )
        .into()),
    }
}

pub fn set_archived(response: &AnalystResponse, archived: bool) -> AnalystResponse {
    let mut updated = response.clone();
    updated.archived = archived;
    updated
}

pub fn mark_not_found(response: &AnalystResponse, note: Option<String>) -> AnalystResponse {
    let mut updated = response.clone();
    updated.not_found = Some(NotFoundMark {
        note: note.filter(|note| !note.trim().is_empty()),
    });
    updated
}

/// Clearing the mark sends the event back to PENDING_RESPONSE.
pub fn clear_not_found(response: &AnalystResponse) -> AnalystResponse {
    let mut updated = response.clone();
    updated.not_found = None;
    updated.resolution = Resolution::Unanswered;
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::vacancy::domain::{EventId, OriginType};
    use crate::workflows::vacancy::lifecycle::record::Substitute;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn key() -> ResponseKey {
        ResponseKey::new(EventId(100), OriginType::Termination)
    }

    fn open_payload() -> ResponsePayload {
        ResponsePayload {
            opened_vacancy: Some(true),
            opened_date: Some(date(2025, 1, 10)),
            ..ResponsePayload::default()
        }
    }

    #[test]
    fn opening_then_filling_follows_the_machine() {
        let today = date(2025, 2, 5);
        let opened = plan_response(key(), None, &open_payload(), today).expect("open accepted");
        assert_eq!(opened.from, LifecycleState::PendingResponse);
        assert_eq!(opened.to, LifecycleState::Open);

        let fill = ResponsePayload {
            vacancy_filled: Some(FillAnswer::Yes),
            closed_date: Some(date(2025, 2, 1)),
            substitute_name: Some("Jane Doe".to_string()),
            ..ResponsePayload::default()
        };
        let filled = plan_response(key(), Some(opened.response.to_row()), &fill, today)
            .expect("fill accepted");
        assert_eq!(filled.from, LifecycleState::Open);
        assert_eq!(filled.to, LifecycleState::Filled);
        assert_eq!(filled.response.resolution.closed_on(), Some(date(2025, 2, 1)));
    }

    #[test]
    fn fill_without_open_date_is_an_invalid_transition() {
        let payload = ResponsePayload {
            vacancy_filled: Some(FillAnswer::Yes),
            closed_date: Some(date(2025, 2, 1)),
            ..ResponsePayload::default()
        };
        let errors = plan_response(key(), None, &payload, date(2025, 2, 5))
            .expect_err("implicit fill requires an open date");
        assert!(errors.has_code(ValidationCode::InvalidTransition));
        assert!(errors.has_field("vacancy_filled"));
    }

    #[test]
    fn filling_requires_closed_date() {
        let opened = plan_response(key(), None, &open_payload(), date(2025, 2, 5))
            .expect("open accepted");
        let payload = ResponsePayload {
            vacancy_filled: Some(FillAnswer::Yes),
            ..ResponsePayload::default()
        };
        let errors = plan_response(key(), Some(opened.response.to_row()), &payload, date(2025, 2, 5))
            .expect_err("closed date required");
        assert!(errors.has_field("closed_date"));
        assert!(errors.has_code(ValidationCode::Required));
    }

    #[test]
    fn not_opened_cannot_jump_to_filled() {
        let from = LifecycleState::NotOpened;
        let to = Resolution::Filled {
            opened_on: Some(date(2025, 1, 10)),
            closed_on: date(2025, 2, 1),
            substitute: None,
        };
        let error = check_transition(from, &to).expect_err("not opened must reopen first");
        assert_eq!(error.code, ValidationCode::InvalidTransition);
    }

    #[test]
    fn reapplying_payload_is_idempotent() {
        let today = date(2025, 2, 5);
        let first = plan_response(key(), None, &open_payload(), today).expect("open accepted");
        let second = plan_response(key(), Some(first.response.to_row()), &open_payload(), today)
            .expect("same state accepted");
        assert_eq!(first.response, second.response);
    }

    #[test]
    fn answering_not_opened_clears_stale_dates() {
        let today = date(2025, 2, 5);
        let opened = plan_response(key(), None, &open_payload(), today).expect("open accepted");
        let payload = ResponsePayload {
            opened_vacancy: Some(false),
            ..ResponsePayload::default()
        };
        let closed = plan_response(key(), Some(opened.response.to_row()), &payload, today)
            .expect("open to not opened accepted");
        assert_eq!(closed.response.resolution, Resolution::NotOpened);
    }

    #[test]
    fn confirm_fill_is_a_no_op_on_filled_records() {
        let mut response = AnalystResponse::unanswered(key());
        response.resolution = Resolution::PendingConfirmation {
            opened_on: Some(date(2025, 1, 10)),
            substitute: Substitute {
                id: Some(EmployeeId(7)),
                name: None,
            },
        };
        let confirmed = confirm_fill(&response, date(2025, 2, 1)).expect("confirmed");
        assert!(matches!(confirmed.resolution, Resolution::Filled { .. }));

        let again = confirm_fill(&confirmed, date(2025, 3, 1)).expect("re-confirm is a no-op");
        assert_eq!(again, confirmed);
    }

    #[test]
    fn archive_round_trip_keeps_resolution() {
        let mut response = AnalystResponse::unanswered(key());
        response.resolution = Resolution::Open {
            opened_on: date(2025, 1, 10),
        };
        let restored = set_archived(&set_archived(&response, true), false);
        assert_eq!(restored.resolution, response.resolution);
        assert!(!restored.archived);
    }

    #[test]
    fn clearing_not_found_resets_to_pending() {
        let mut response = AnalystResponse::unanswered(key());
        response.resolution = Resolution::NotOpened;
        let marked = mark_not_found(&response, Some("no record at unit".to_string()));
        let cleared = clear_not_found(&marked);
        assert!(cleared.not_found.is_none());
        assert_eq!(cleared.resolution, Resolution::Unanswered);
    }
}
