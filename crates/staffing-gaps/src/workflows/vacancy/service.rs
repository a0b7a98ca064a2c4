use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::chain::{ChainError, ChainView, SubstitutionForest};
use super::domain::{
    AnalystAssignment, AnalystRef, Candidate, EventId, LedgerDraft, ManualVacancy,
    ManualVacancyDraft, ResponseKey, RosterEntry, VacancyEvent,
};
use super::headcount::{reconcile, reconcile_all, HeadcountLine};
use super::ingestion::{EventIngestor, IngestionPartition};
use super::lifecycle::{
    clear_not_found, confirm_fill, derive_view, mark_not_found, merge, plan_response,
    set_archived, AnalystResponse, EffectiveView, Resolution, ResponsePayload, ResponseRow,
};
use super::matching::{
    rank_candidates, review_linkages, LinkageReview, MatchRules, MatchTarget, PendingLinkage,
    ScoredCandidate,
};
use super::sla::{assess, summarize, SlaAssessment, SlaPolicy, SlaSummary};
use super::store::{RosterFilter, StoreError, VacancyStore};
use super::validation::ValidationErrors;
use super::workload::{analyst_workload, AnalystWorkload};
use crate::config::ReconciliationConfig;

/// Error raised by the vacancy service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0} not found")]
    NotFound(String),
}

/// SLA counters plus the events that tripped a threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlaReport {
    pub summary: SlaSummary,
    pub flagged: Vec<SlaAssessment>,
}

/// Composes the store with the pure reconciliation components.
pub struct VacancyService<S> {
    store: Arc<S>,
    ingestor: EventIngestor,
    rules: MatchRules,
    policy: SlaPolicy,
    workload_critical_days: i64,
}

impl<S> VacancyService<S>
where
    S: VacancyStore + 'static,
{
    pub fn new(store: Arc<S>, config: &ReconciliationConfig) -> Self {
        Self {
            store,
            ingestor: EventIngestor::new(config.chunk_size),
            rules: config.match_rules(),
            policy: config.sla_policy(),
            workload_critical_days: config.workload_critical_days,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn ingestor(&self) -> EventIngestor {
        self.ingestor
    }

    pub async fn ingest(&self) -> IngestionPartition {
        self.ingestor.run(self.store.as_ref()).await
    }

    async fn stored_row(&self, key: ResponseKey) -> Result<Option<ResponseRow>, ServiceError> {
        let rows = self.store.responses_for_events(&[key.event_id]).await?;
        Ok(rows.into_iter().find(|row| row.key() == key))
    }

    async fn stored_or_empty(&self, key: ResponseKey) -> Result<AnalystResponse, ServiceError> {
        Ok(self
            .stored_row(key)
            .await?
            .map(AnalystResponse::from_stored)
            .unwrap_or_else(|| AnalystResponse::unanswered(key)))
    }

    async fn save(&self, response: AnalystResponse) -> Result<AnalystResponse, ServiceError> {
        let row = self.store.upsert_response(response.to_row()).await?;
        Ok(AnalystResponse::from_stored(row))
    }

    async fn find_event(&self, key: ResponseKey) -> Result<VacancyEvent, ServiceError> {
        let partition = self.ingest().await;
        partition
            .find(key)
            .map(|(event, _)| event.clone())
            .ok_or_else(|| ServiceError::NotFound(format!("vacancy event {key}")))
    }

    /// Validates an analyst edit and upserts it. Nothing is written when the
    /// edit is rejected.
    pub async fn respond(
        &self,
        key: ResponseKey,
        payload: &ResponsePayload,
        today: NaiveDate,
    ) -> Result<AnalystResponse, ServiceError> {
        let existing = self.stored_row(key).await?;
        let planned = plan_response(key, existing, payload, today)?;
        tracing::info!(event = %key, from = %planned.from, to = %planned.to, "recording analyst response");
        self.save(planned.response).await
    }

    /// Server state for `key` with an unsaved draft layered on top.
    pub async fn preview(
        &self,
        key: ResponseKey,
        draft: Option<&ResponsePayload>,
    ) -> Result<EffectiveView, ServiceError> {
        let event = self.find_event(key).await?;
        let server = self.stored_row(key).await?.map(AnalystResponse::from_stored);
        Ok(merge(&event, server.as_ref(), draft))
    }

    pub async fn confirm_fill(
        &self,
        key: ResponseKey,
        closed_on: NaiveDate,
    ) -> Result<AnalystResponse, ServiceError> {
        let stored = self
            .stored_row(key)
            .await?
            .map(AnalystResponse::from_stored)
            .ok_or_else(|| ServiceError::NotFound(format!("response for {key}")))?;
        let confirmed = confirm_fill(&stored, closed_on)?;
        if confirmed == stored {
            return Ok(stored);
        }
        self.save(confirmed).await
    }

    pub async fn set_archived(
        &self,
        key: ResponseKey,
        archived: bool,
    ) -> Result<AnalystResponse, ServiceError> {
        let current = self.stored_or_empty(key).await?;
        self.save(set_archived(&current, archived)).await
    }

    pub async fn mark_not_found(
        &self,
        key: ResponseKey,
        note: Option<String>,
    ) -> Result<AnalystResponse, ServiceError> {
        let current = self.stored_or_empty(key).await?;
        self.save(mark_not_found(&current, note)).await
    }

    pub async fn clear_not_found(&self, key: ResponseKey) -> Result<AnalystResponse, ServiceError> {
        let current = self.stored_or_empty(key).await?;
        if current.not_found.is_none() {
            return Ok(current);
        }
        self.save(clear_not_found(&current)).await
    }

    async fn forest(&self, partition: &IngestionPartition) -> Result<SubstitutionForest, ServiceError> {
        let links = self.store.responses_with_parent_links().await?;
        let events = partition.working_set().map(|(event, response)| {
            (event.id, event.event_date, derive_view(event, response).base_state)
        });
        let links = links
            .into_iter()
            .filter_map(|row| row.parent_event_id.map(|parent| (row.event_id, parent)));
        Ok(SubstitutionForest::from_links(events, links))
    }

    /// Links `key` under the vacancy it backfilled, or detaches it. The cycle
    /// check runs before anything is written.
    pub async fn set_parent(
        &self,
        key: ResponseKey,
        parent: Option<EventId>,
    ) -> Result<AnalystResponse, ServiceError> {
        let partition = self.ingest().await;
        let mut forest = self.forest(&partition).await?;
        forest.set_parent(key.event_id, parent)?;

        let mut current = self.stored_or_empty(key).await?;
        current.parent_event_id = parent;
        self.save(current).await
    }

    pub async fn chain(&self, root: EventId) -> Result<ChainView, ServiceError> {
        let partition = self.ingest().await;
        let forest = self.forest(&partition).await?;
        Ok(forest.chain(root)?)
    }

    pub async fn match_substitutes(
        &self,
        name_fragment: &str,
        target: &MatchTarget,
    ) -> Result<Vec<ScoredCandidate>, ServiceError> {
        let pool = self
            .store
            .search_candidates(name_fragment, self.store.limits().max_page_rows)
            .await?;
        Ok(rank_candidates(&self.rules, name_fragment, target, &pool))
    }

    /// Ranks replacements for the role, location, and contract of an event.
    pub async fn match_for_event(
        &self,
        key: ResponseKey,
        name_fragment: &str,
    ) -> Result<Vec<ScoredCandidate>, ServiceError> {
        let event = self.find_event(key).await?;
        let target = MatchTarget {
            role: event.role.clone(),
            location: event
                .location
                .cost_center
                .clone()
                .or_else(|| event.location.workplace.clone())
                .unwrap_or_default(),
            contract: event.contract.clone(),
        };
        self.match_substitutes(name_fragment, &target).await
    }

    async fn full_roster(&self) -> Result<Vec<RosterEntry>, ServiceError> {
        let page_size = self.store.limits().max_page_rows.max(1);
        let mut roster = Vec::new();
        loop {
            let page = self
                .store
                .roster_page(RosterFilter::All, roster.len(), page_size)
                .await?;
            let done = page.len() < page_size;
            roster.extend(page);
            if done {
                return Ok(roster);
            }
        }
    }

    pub async fn headcount(&self, role: &str, location: &str) -> Result<HeadcountLine, ServiceError> {
        let targets = self.store.headcount_targets().await?;
        let roster = self.full_roster().await?;
        Ok(reconcile(role, location, &targets, &roster))
    }

    pub async fn headcount_overview(&self) -> Result<Vec<HeadcountLine>, ServiceError> {
        let targets = self.store.headcount_targets().await?;
        let roster = self.full_roster().await?;
        Ok(reconcile_all(&targets, &roster))
    }

    pub fn sla_report(&self, partition: &IngestionPartition, today: NaiveDate) -> SlaReport {
        let flagged = partition
            .working_set()
            .map(|(event, response)| assess(event, response, today, &self.policy))
            .filter(|assessment| assessment.critical || !assessment.suspicious.is_empty())
            .collect();
        SlaReport {
            summary: summarize(partition.working_set(), today, &self.policy),
            flagged,
        }
    }

    pub async fn sla(&self, today: NaiveDate) -> SlaReport {
        let partition = self.ingest().await;
        self.sla_report(&partition, today)
    }

    pub async fn workload(&self, today: NaiveDate) -> Result<Vec<AnalystWorkload>, ServiceError> {
        let assignments = self.store.assignments().await?;
        let partition = self.ingest().await;
        Ok(analyst_workload(
            &assignments,
            partition.working_set(),
            today,
            self.workload_critical_days,
        ))
    }

    /// Assigns an analyst, creating the ledger event first when the event still
    /// carries its synthetic id. A response filed under the synthetic id is
    /// copied to the real one.
    pub async fn assign(
        &self,
        key: ResponseKey,
        analyst: AnalystRef,
        contract_id: Option<String>,
        today: NaiveDate,
    ) -> Result<AnalystAssignment, ServiceError> {
        let event = self.find_event(key).await?;
        let mut event_id = event.id;

        if event.needs_creation {
            let employee_id = event
                .employee_id
                .ok_or_else(|| ServiceError::NotFound(format!("employee for {key}")))?;
            let created = self
                .store
                .create_ledger_event(LedgerDraft {
                    employee_id,
                    event_date: event.event_date,
                    origin_status: event.origin_status.clone(),
                    origin_type: event.origin_type,
                })
                .await?;
            event_id = created.event_id;
            tracing::info!(synthetic = %event.id, created = %event_id, "created ledger event");

            if let Some(row) = self.stored_row(key).await? {
                let mut moved = row;
                moved.event_id = event_id;
                self.store.upsert_response(moved).await?;
            }
        }

        let assignment = AnalystAssignment {
            event_id,
            analyst,
            contract_id: contract_id.or_else(|| event.contract.contract_id.clone()),
            assigned_on: today,
            active: true,
        };
        Ok(self.store.insert_assignment(assignment).await?)
    }

    pub async fn register_manual_vacancy(
        &self,
        draft: ManualVacancyDraft,
    ) -> Result<ManualVacancy, ServiceError> {
        Ok(self.store.insert_manual_vacancy(draft).await?)
    }

    /// The only hard delete in the system.
    pub async fn remove_manual_vacancy(&self, id: i64) -> Result<(), ServiceError> {
        match self.store.delete_manual_vacancy(id).await {
            Err(StoreError::NotFound) => Err(ServiceError::NotFound(format!("manual vacancy {id}"))),
            other => Ok(other?),
        }
    }

    /// Responses that name a substitute, or record a fill, without linking an
    /// employee id, with suggested matches.
    pub async fn pending_linkages(&self) -> Result<Vec<LinkageReview>, ServiceError> {
        let partition = self.ingest().await;
        let pending: Vec<PendingLinkage> = partition
            .responded
            .iter()
            .filter_map(|responded| {
                let resolution = &responded.response.resolution;
                let substitute = resolution.substitute();
                let unlinked_name = substitute
                    .filter(|substitute| substitute.id.is_none())
                    .and_then(|substitute| substitute.name.clone());
                let unnamed_fill = matches!(resolution, Resolution::Filled { substitute: None, .. });
                (unlinked_name.is_some() || unnamed_fill).then(|| PendingLinkage {
                    key: responded.response.key,
                    substitute_name: unlinked_name,
                    role: responded.event.role.clone(),
                })
            })
            .collect();
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let pool: Vec<Candidate> = self
            .full_roster()
            .await?
            .iter()
            .filter(|entry| entry.status.is_active())
            .map(Candidate::from)
            .collect();
        tracing::debug!(pending = pending.len(), pool = pool.len(), "reviewing substitute linkages");
        Ok(review_linkages(&self.rules, pending, &pool))
    }
}
