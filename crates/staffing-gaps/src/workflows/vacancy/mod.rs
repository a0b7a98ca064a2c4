//! Vacancy lifecycle reconciliation: turns roster status changes into
//! trackable staffing gaps and reconciles analyst responses against them.

pub mod chain;
pub mod domain;
pub mod headcount;
pub mod ingestion;
pub mod lifecycle;
pub mod matching;
pub mod poller;
pub mod router;
pub mod service;
pub mod sla;
pub mod snapshot;
pub mod store;
pub mod validation;
pub mod workload;

#[cfg(test)]
mod tests;

pub use chain::{ChainEntry, ChainError, ChainView, SubstitutionForest};
pub use domain::{
    AnalystAssignment, AnalystRef, Candidate, ContractRef, EmployeeId, EmployeeStatus, EventId,
    FillAnswer, HeadcountTarget, LedgerEntry, Location, ManualVacancy, ManualVacancyDraft,
    MovementKind, OriginType, ResponseKey, RosterEntry, VacancyEvent,
};
pub use headcount::{HeadcountLine, HeadcountStatus};
pub use ingestion::{EventIngestor, IngestionPartition};
pub use lifecycle::{AnalystResponse, LifecycleState, Resolution, ResponsePayload, ResponseRow};
pub use matching::{MatchRules, MatchTarget, ScoredCandidate};
pub use poller::{EventNotifier, LogNotifier, NewEventPoller, NewEventSummary};
pub use router::vacancy_router;
pub use service::{ServiceError, SlaReport, VacancyService};
pub use sla::{SlaPolicy, SlaSummary};
pub use snapshot::SnapshotError;
pub use store::{MemoryStore, StoreError, StoreLimits, StoreSeed, VacancyStore};
pub use validation::{FieldError, ValidationCode, ValidationErrors};
