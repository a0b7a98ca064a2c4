use serde::Serialize;

use super::super::domain::VacancyEvent;
use super::super::validation::ValidationErrors;
use super::record::AnalystResponse;
use super::state::{derive_view, LifecycleView};
use super::transition::{apply_payload, check_transition, ResponsePayload};

/// What a reader should see for one event: the persisted response overlaid
/// with an unsaved local draft, when that draft is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveView {
    pub response: AnalystResponse,
    pub lifecycle: LifecycleView,
    pub has_unsaved_changes: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_errors: Option<ValidationErrors>,
}

/// Reconciles server state with a local draft. Called once per read.
///
/// An invalid draft never leaks into the effective response; its errors are
/// reported next to the server view instead.
pub fn merge(
    event: &VacancyEvent,
    server: Option<&AnalystResponse>,
    draft: Option<&ResponsePayload>,
) -> EffectiveView {
    let server = server
        .filter(|response| response.key == event.key())
        .cloned()
        .unwrap_or_else(|| AnalystResponse::unanswered(event.key()));

    let draft = draft.filter(|draft| !draft.is_empty());
    let Some(draft) = draft else {
        return view(event, server, false, None);
    };

    let from = derive_view(event, Some(&server)).base_state;
    let merged: Result<AnalystResponse, ValidationErrors> =
        AnalystResponse::try_from(apply_payload(server.to_row(), draft)).and_then(|candidate| {
            check_transition(from, &candidate.resolution)?;
            Ok(candidate)
        });

    match merged {
        Ok(candidate) => {
            let changed = candidate != server;
            view(event, candidate, changed, None)
        }
        Err(errors) => view(event, server, true, Some(errors)),
    }
}

fn view(
    event: &VacancyEvent,
    response: AnalystResponse,
    has_unsaved_changes: bool,
    draft_errors: Option<ValidationErrors>,
) -> EffectiveView {
    let lifecycle = derive_view(event, Some(&response));
    EffectiveView {
        response,
        lifecycle,
        has_unsaved_changes,
        draft_errors,
    }
}
