use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::super::domain::VacancyEvent;
use super::record::{AnalystResponse, Resolution};

/// Effective status of a vacancy event.
///
/// The first five variants are computed from the resolution. `Archived` and
/// `NotFound` are overlays and only ever appear as the effective state of a
/// [`LifecycleView`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    PendingResponse,
    NotOpened,
    Open,
    PendingConfirmation,
    Filled,
    Archived,
    NotFound,
}

impl LifecycleState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PendingResponse => "PENDING_RESPONSE",
            Self::NotOpened => "NOT_OPENED",
            Self::Open => "OPEN",
            Self::PendingConfirmation => "PENDING_CONFIRMATION",
            Self::Filled => "FILLED",
            Self::Archived => "ARCHIVED",
            Self::NotFound => "NOT_FOUND",
        }
    }

    /// Computed states that still need an analyst to act.
    pub const fn is_unresolved(self) -> bool {
        matches!(
            self,
            Self::PendingResponse | Self::Open | Self::PendingConfirmation
        )
    }

    pub const fn is_overlay(self) -> bool {
        matches!(self, Self::Archived | Self::NotFound)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Effective state together with the computed state underneath any overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LifecycleView {
    pub state: LifecycleState,
    pub base_state: LifecycleState,
    pub archived: bool,
    pub not_found: bool,
}

pub fn base_state(resolution: &Resolution) -> LifecycleState {
    match resolution {
        Resolution::Unanswered => LifecycleState::PendingResponse,
        Resolution::NotOpened => LifecycleState::NotOpened,
        Resolution::Open { .. } => LifecycleState::Open,
        Resolution::PendingConfirmation { .. } => LifecycleState::PendingConfirmation,
        Resolution::Filled { .. } => LifecycleState::Filled,
    }
}

pub fn derive_view(event: &VacancyEvent, response: Option<&AnalystResponse>) -> LifecycleView {
    let response = response.filter(|response| response.key == event.key());
    let Some(response) = response else {
        return LifecycleView {
            state: LifecycleState::PendingResponse,
            base_state: LifecycleState::PendingResponse,
            archived: false,
            not_found: false,
        };
    };

    let base = base_state(&response.resolution);
    let not_found = response.not_found.is_some();
    let state = if not_found {
        LifecycleState::NotFound
    } else if response.archived {
        LifecycleState::Archived
    } else {
        base
    };

    LifecycleView {
        state,
        base_state: base,
        archived: response.archived,
        not_found,
    }
}

/// Total derivation of an event's effective state. A response filed under a
/// different key is ignored.
pub fn derive_state(event: &VacancyEvent, response: Option<&AnalystResponse>) -> LifecycleState {
    derive_view(event, response).state
}

/// Days the gap has been (or was) open. `None` when no vacancy was opened.
pub fn days_open(event: &VacancyEvent, resolution: &Resolution, today: NaiveDate) -> Option<i64> {
    let started = resolution.opened_on().unwrap_or(event.event_date);
    match resolution {
        Resolution::NotOpened => None,
        Resolution::Unanswered => Some((today - event.event_date).num_days()),
        Resolution::Open { .. } | Resolution::PendingConfirmation { .. } => {
            Some((today - started).num_days())
        }
        Resolution::Filled { closed_on, .. } => Some((*closed_on - started).num_days()),
    }
}
