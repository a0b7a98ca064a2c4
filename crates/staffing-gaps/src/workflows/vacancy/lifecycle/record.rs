use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::domain::{
    AnalystRef, EmployeeId, EventId, FillAnswer, OriginType, ResponseKey,
};
use super::super::validation::{FieldError, ValidationCode, ValidationErrors};

/// Flat response row exactly as the store persists it.
///
/// Every combination of fields is representable here; [`AnalystResponse`] is the
/// validated form the rest of the engine works with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRow {
    pub event_id: EventId,
    pub origin_type: OriginType,
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
    pub pending_confirmation: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub not_found: bool,
    #[serde(default)]
    pub not_found_note: Option<String>,
    #[serde(default)]
    pub parent_event_id: Option<EventId>,
    #[serde(default)]
    pub analyst_id: Option<i64>,
    #[serde(default)]
    pub analyst_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub responded_on: Option<NaiveDate>,
}

impl ResponseRow {
    pub fn empty(key: ResponseKey) -> Self {
        Self {
            event_id: key.event_id,
            origin_type: key.origin_type,
            opened_vacancy: None,
            opened_date: None,
            vacancy_filled: None,
            closed_date: None,
            substitute_id: None,
            substitute_name: None,
            pending_confirmation: false,
            archived: false,
            not_found: false,
            not_found_note: None,
            parent_event_id: None,
            analyst_id: None,
            analyst_name: None,
            note: None,
            responded_on: None,
        }
    }

    pub fn key(&self) -> ResponseKey {
        ResponseKey::new(self.event_id, self.origin_type)
    }

    fn substitute(&self) -> Option<Substitute> {
        let name = self
            .substitute_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        if self.substitute_id.is_none() && name.is_none() {
            return None;
        }
        Some(Substitute {
            id: self.substitute_id,
            name,
        })
    }
}

/// Who filled (or is about to fill) the gap. At least one field is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitute {
    pub id: Option<EmployeeId>,
    pub name: Option<String>,
}

/// The analyst's decision, one variant per computed lifecycle state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resolution {
    Unanswered,
    NotOpened,
    Open {
        opened_on: NaiveDate,
    },
    PendingConfirmation {
        opened_on: Option<NaiveDate>,
        substitute: Substitute,
    },
    Filled {
        opened_on: Option<NaiveDate>,
        closed_on: NaiveDate,
        substitute: Option<Substitute>,
    },
}

impl Resolution {
    pub fn opened_on(&self) -> Option<NaiveDate> {
        match self {
            Resolution::Open { opened_on } => Some(*opened_on),
            Resolution::PendingConfirmation { opened_on, .. }
            | Resolution::Filled { opened_on, .. } => *opened_on,
            Resolution::Unanswered | Resolution::NotOpened => None,
        }
    }

    pub fn closed_on(&self) -> Option<NaiveDate> {
        match self {
            Resolution::Filled { closed_on, .. } => Some(*closed_on),
            _ => None,
        }
    }

    pub fn substitute(&self) -> Option<&Substitute> {
        match self {
            Resolution::PendingConfirmation { substitute, .. } => Some(substitute),
            Resolution::Filled { substitute, .. } => substitute.as_ref(),
            _ => None,
        }
    }

    /// Best-effort reading of rows that predate validation. Never fails.
    pub(crate) fn lenient(row: &ResponseRow) -> Self {
        let substitute = row.substitute();
        if row.pending_confirmation {
            if let Some(substitute) = substitute.clone() {
                return Resolution::PendingConfirmation {
                    opened_on: row.opened_date,
                    substitute,
                };
            }
        }
        if row.vacancy_filled == Some(FillAnswer::Yes) {
            if let Some(closed_on) = row.closed_date {
                return Resolution::Filled {
                    opened_on: row.opened_date.filter(|opened| *opened <= closed_on),
                    closed_on,
                    substitute,
                };
            }
        }
        match (row.opened_vacancy, row.opened_date) {
            (Some(false), _) => Resolution::NotOpened,
            (_, Some(opened_on)) => Resolution::Open { opened_on },
            _ => Resolution::Unanswered,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundMark {
    pub note: Option<String>,
}

/// Validated analyst response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalystResponse {
    pub key: ResponseKey,
    pub resolution: Resolution,
    pub archived: bool,
    pub not_found: Option<NotFoundMark>,
    pub parent_event_id: Option<EventId>,
    pub analyst: Option<AnalystRef>,
    pub note: Option<String>,
    pub responded_on: Option<NaiveDate>,
}

impl AnalystResponse {
    pub fn unanswered(key: ResponseKey) -> Self {
        Self {
            key,
            resolution: Resolution::Unanswered,
            archived: false,
            not_found: None,
            parent_event_id: None,
            analyst: None,
            note: None,
            responded_on: None,
        }
    }

    /// Reads a stored row, falling back to [`Resolution::lenient`] when the
    /// row breaks an invariant. Such rows are logged, never rejected, because
    /// they are already persisted.
    pub fn from_stored(row: ResponseRow) -> Self {
        match AnalystResponse::try_from(row.clone()) {
            Ok(response) => response,
            Err(errors) => {
                tracing::warn!(key = %row.key(), %errors, "stored response violates invariants");
                let mut response = Self::with_resolution(&row, Resolution::lenient(&row));
                if response.parent_event_id == Some(row.event_id) {
                    response.parent_event_id = None;
                }
                response
            }
        }
    }

    fn with_resolution(row: &ResponseRow, resolution: Resolution) -> Self {
        let analyst = match (row.analyst_id, row.analyst_name.as_ref()) {
            (Some(id), Some(name)) => Some(AnalystRef {
                id,
                name: name.clone(),
            }),
            (Some(id), None) => Some(AnalystRef {
                id,
                name: String::new(),
            }),
            _ => None,
        };
        Self {
            key: row.key(),
            resolution,
            archived: row.archived,
            not_found: row.not_found.then(|| NotFoundMark {
                note: row.not_found_note.clone(),
            }),
            parent_event_id: row.parent_event_id,
            analyst,
            note: row.note.clone(),
            responded_on: row.responded_on,
        }
    }

    pub fn to_row(&self) -> ResponseRow {
        let mut row = ResponseRow::empty(self.key);
        match &self.resolution {
            Resolution::Unanswered => {}
            Resolution::NotOpened => {
                row.opened_vacancy = Some(false);
            }
            Resolution::Open { opened_on } => {
                row.opened_vacancy = Some(true);
                row.opened_date = Some(*opened_on);
                row.vacancy_filled = Some(FillAnswer::No);
            }
            Resolution::PendingConfirmation {
                opened_on,
                substitute,
            } => {
                row.opened_vacancy = opened_on.map(|_| true);
                row.opened_date = *opened_on;
                row.pending_confirmation = true;
                row.substitute_id = substitute.id;
                row.substitute_name = substitute.name.clone();
            }
            Resolution::Filled {
                opened_on,
                closed_on,
                substitute,
            } => {
                row.opened_vacancy = opened_on.map(|_| true);
                row.opened_date = *opened_on;
                row.vacancy_filled = Some(FillAnswer::Yes);
                row.closed_date = Some(*closed_on);
                if let Some(substitute) = substitute {
                    row.substitute_id = substitute.id;
                    row.substitute_name = substitute.name.clone();
                }
            }
        }
        row.archived = self.archived;
        if let Some(mark) = &self.not_found {
            row.not_found = true;
            row.not_found_note = mark.note.clone();
        }
        row.parent_event_id = self.parent_event_id;
        if let Some(analyst) = &self.analyst {
            row.analyst_id = Some(analyst.id);
            row.analyst_name = Some(analyst.name.clone()).filter(|name| !name.is_empty());
        }
        row.note = self.note.clone();
        row.responded_on = self.responded_on;
        row
    }
}

impl TryFrom<ResponseRow> for AnalystResponse {
    type Error = ValidationErrors;

    fn try_from(row: ResponseRow) -> Result<Self, Self::Error> {
        let mut errors = ValidationErrors::default();
        let substitute = row.substitute();
        let filled = row.vacancy_filled == Some(FillAnswer::Yes);

        if row.opened_vacancy == Some(true) && row.opened_date.is_none() {
            errors.push(FieldError::required(
                "opened_date",
                "opened_vacancy=true requires opened_date",
            ));
        }
        if row.opened_vacancy == Some(false) {
            if row.opened_date.is_some() {
                errors.push(FieldError::inconsistent(
                    "opened_date",
                    "opened_date cannot be set when the vacancy was not opened",
                ));
            }
            if filled {
                errors.push(FieldError::inconsistent(
                    "vacancy_filled",
                    "a vacancy that was not opened cannot be filled",
                ));
            }
            if row.pending_confirmation {
                errors.push(FieldError::inconsistent(
                    "pending_confirmation",
                    "a vacancy that was not opened cannot await confirmation",
                ));
            }
        }
        if filled && row.closed_date.is_none() {
            errors.push(FieldError::required(
                "closed_date",
                "vacancy_filled=SIM requires closed_date",
            ));
        }
        if !filled && row.closed_date.is_some() {
            errors.push(FieldError::inconsistent(
                "closed_date",
                "closed_date requires vacancy_filled=SIM",
            ));
        }
        if let (Some(opened), Some(closed)) = (row.opened_date, row.closed_date) {
            if closed < opened {
                errors.push(FieldError::new(
                    "closed_date",
                    ValidationCode::DateOrder,
                    format!("closed_date {closed} precedes opened_date {opened}"),
                ));
            }
        }
        if row.pending_confirmation && substitute.is_none() {
            errors.push(FieldError::required(
                "substitute_id",
                "pending confirmation requires a substitute id or name",
            ));
        }
        if row.parent_event_id == Some(row.event_id) {
            errors.push(FieldError::new(
                "parent_event_id",
                ValidationCode::Cycle,
                "an event cannot backfill itself",
            ));
        }
        if row.not_found_note.is_some() && !row.not_found {
            errors.push(FieldError::inconsistent(
                "not_found_note",
                "not_found_note requires not_found=true",
            ));
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        let closed_when_filled = if filled { row.closed_date } else { None };
        let resolution = match (row.pending_confirmation, substitute, closed_when_filled) {
            (true, Some(substitute), _) => Resolution::PendingConfirmation {
                opened_on: row.opened_date,
                substitute,
            },
            (_, substitute, Some(closed_on)) => Resolution::Filled {
                opened_on: row.opened_date,
                closed_on,
                substitute,
            },
            _ => match (row.opened_vacancy, row.opened_date) {
                (Some(false), _) => Resolution::NotOpened,
                (_, Some(opened_on)) => Resolution::Open { opened_on },
                _ => Resolution::Unanswered,
            },
        };

        Ok(Self::with_resolution(&row, resolution))
    }
}
