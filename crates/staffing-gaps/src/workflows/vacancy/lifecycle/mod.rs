//! Response records and the state machine derived from them.

mod merge;
mod record;
mod state;
mod transition;

pub use merge::{merge, EffectiveView};
pub use record::{AnalystResponse, NotFoundMark, Resolution, ResponseRow, Substitute};
pub use state::{base_state, days_open, derive_state, derive_view, LifecycleState, LifecycleView};
pub use transition::{
    apply_payload, check_transition, clear_not_found, confirm_fill, mark_not_found,
    plan_response, set_archived, PlannedResponse, ResponsePayload,
};
