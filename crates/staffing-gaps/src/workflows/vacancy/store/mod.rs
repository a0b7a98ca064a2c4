//! Persistence seam. The engine never talks to a database directly; it issues
//! bounded calls through [`VacancyStore`].

mod memory;

use async_trait::async_trait;

use super::domain::{
    AnalystAssignment, Candidate, EmployeeId, EventId, HeadcountTarget, LedgerDraft, LedgerEntry,
    ManualVacancy, ManualVacancyDraft, RosterEntry,
};
use super::lifecycle::ResponseRow;

pub use memory::{MemoryStore, StoreSeed};

/// Per-call limits the backing store enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    /// Maximum ids in one list-membership filter.
    pub max_in_list: usize,
    /// Maximum rows returned by one unfiltered scan or page.
    pub max_page_rows: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_in_list: 100,
            max_page_rows: 1000,
        }
    }
}

/// Which roster rows a page should contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterFilter {
    /// Terminated and on-leave employees.
    VacancySources,
    All,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request for {requested} rows exceeds the store limit of {max}")]
    LimitExceeded { requested: usize, max: usize },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Conflict,
}

#[async_trait]
pub trait VacancyStore: Send + Sync {
    fn limits(&self) -> StoreLimits;

    async fn roster_page(
        &self,
        filter: RosterFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<RosterEntry>, StoreError>;

    async fn ledger_for_employees(
        &self,
        employees: &[EmployeeId],
    ) -> Result<Vec<LedgerEntry>, StoreError>;

    async fn create_ledger_event(&self, draft: LedgerDraft) -> Result<LedgerEntry, StoreError>;

    async fn responses_for_events(&self, events: &[EventId])
        -> Result<Vec<ResponseRow>, StoreError>;

    /// Atomic upsert keyed by (event_id, origin_type). Last write wins.
    async fn upsert_response(&self, row: ResponseRow) -> Result<ResponseRow, StoreError>;

    async fn responses_with_parent_links(&self) -> Result<Vec<ResponseRow>, StoreError>;

    async fn manual_vacancies(&self) -> Result<Vec<ManualVacancy>, StoreError>;

    async fn insert_manual_vacancy(
        &self,
        draft: ManualVacancyDraft,
    ) -> Result<ManualVacancy, StoreError>;

    async fn delete_manual_vacancy(&self, id: i64) -> Result<(), StoreError>;

    async fn assignments(&self) -> Result<Vec<AnalystAssignment>, StoreError>;

    async fn insert_assignment(
        &self,
        assignment: AnalystAssignment,
    ) -> Result<AnalystAssignment, StoreError>;

    async fn headcount_targets(&self) -> Result<Vec<HeadcountTarget>, StoreError>;

    /// Active employees whose name contains `fragment`.
    async fn search_candidates(
        &self,
        fragment: &str,
        limit: usize,
    ) -> Result<Vec<Candidate>, StoreError>;
}
